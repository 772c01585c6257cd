//! Session entity: serializable record, live bindings and the write path.

mod binding;
mod envelope;
mod handle;
mod record;
mod types;

pub use binding::{BackwardsInvocation, PluginRuntime, SessionBindings};
pub use envelope::{encode, Envelope, StreamEvent};
pub use handle::Session;
pub use record::{
    CloseSessionPayload, DeleteSessionPayload, GetSessionPayload, NewSessionPayload,
    SessionRecord,
};
pub use types::{AccessAction, AccessType, PluginDeclaration, PluginUniqueIdentifier};
