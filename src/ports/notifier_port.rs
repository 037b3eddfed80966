//! Text notifications.

use crate::domain::error::PipelineError;

pub trait NotifierPort {
    /// Short name used in logs and retry errors.
    fn name(&self) -> &str;

    fn send(&self, message: &str) -> Result<(), PipelineError>;
}
