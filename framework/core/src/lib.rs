mod abort;
mod shutdown;

pub mod prelude {
    pub use crate::abort::AbortRunError;
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle};
}
