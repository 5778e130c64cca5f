//! Gateway protocol definitions
//!
//! Op codes, the envelope codec, close codes and control payloads.

mod close_codes;
mod envelope;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use envelope::{CodecError, Envelope};
pub use opcodes::OpCode;
pub use payloads::{
    Activity, HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload,
    RequestGuildMembersPayload, ResumePayload, Status, VoiceStateUpdatePayload,
};
