use std::result::Result as StdResult;

use anyhow::Result;
use libprehook::PrehookError;
use prehook_term::{Output, OutputError};

/// Convert output-layer failures into domain errors.
pub fn map_output_error(err: OutputError) -> PrehookError {
    match err {
        OutputError::Cancelled => PrehookError::UserAborted,
        other => PrehookError::OperationError(format!("Output operation failed: {other}")),
    }
}

/// Emit an output result, mapping errors into `PrehookError`.
pub fn emit(result: StdResult<(), OutputError>) -> Result<()> {
    result.map_err(map_output_error)?;
    Ok(())
}

/// Prompt for confirmation, mapping cancellation to `UserAborted`.
pub fn prompt_confirm(output: &dyn Output, prompt: &str) -> Result<bool> {
    match output.confirm(prompt) {
        Ok(value) => Ok(value),
        Err(OutputError::Cancelled) => Err(PrehookError::UserAborted.into()),
        Err(err) => Err(map_output_error(err).into()),
    }
}
