mod duration;
mod result;
mod semaphore;
mod shutdown;

pub mod prelude {
    pub use crate::duration::{parse_duration_to_seconds, DurationParseError, ScenarioDuration};
    pub use crate::result::{Batch, RunResult, ScenarioUpdate};
    pub use crate::semaphore::{Semaphore, SemaphorePermit};
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
}
