//! Legacy binary `.doc` extraction through an external converter.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::Once;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::ExtractError;

static CONVERTER_MISSING: Once = Once::new();

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Converts a `.doc` file with `program <file>` and returns its standard output.
///
/// The bytes are written to a temporary file first. The converter is killed
/// when it outlives `timeout`. A missing converter is reported once per
/// process.
pub fn extract_legacy_doc_text(
    bytes: &[u8],
    program: &str,
    timeout: Duration,
) -> Result<String, ExtractError> {
    let mut file = tempfile::Builder::new()
        .prefix("harvester-")
        .suffix(".doc")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;

    let mut child = match Command::new(program)
        .arg(file.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            CONVERTER_MISSING.call_once(|| {
                warn!(
                    program,
                    "legacy .doc converter not installed; .doc attachments will yield no text"
                );
            });
            return Err(ExtractError::ConverterMissing {
                program: program.to_string(),
            });
        }
        Err(error) => return Err(error.into()),
    };

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExtractError::converter_failed(program, "stdout not captured"))?;
    let reader = thread::spawn(move || {
        let mut output = Vec::new();
        stdout.read_to_end(&mut output).map(|_| output)
    });

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExtractError::converter_failed(
                program,
                format!("timed out after {}s", timeout.as_secs()),
            ));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = reader
        .join()
        .map_err(|_| ExtractError::converter_failed(program, "output reader panicked"))??;

    if !status.success() {
        return Err(ExtractError::converter_failed(
            program,
            format!("exited with {status}"),
        ));
    }

    debug!(program, bytes = output.len(), "legacy document converted");
    Ok(String::from_utf8_lossy(&output).into_owned())
}

#[cfg(all(test, unix))]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_converter_is_reported() {
        let result = extract_legacy_doc_text(b"doc", "harvester-no-such-converter", Duration::from_secs(1));
        assert!(matches!(result, Err(ExtractError::ConverterMissing { .. })));
    }

    #[test]
    fn test_converter_output_is_returned() {
        // `cat` echoes the temporary file back, standing in for a converter.
        let result = extract_legacy_doc_text(b"ecrire a rh@ngo.ma", "cat", Duration::from_secs(5));
        assert_eq!(result.expect("cat succeeds"), "ecrire a rh@ngo.ma");
    }

    #[test]
    fn test_failing_converter_is_error() {
        let result = extract_legacy_doc_text(b"doc", "false", Duration::from_secs(5));
        assert!(matches!(result, Err(ExtractError::ConverterFailed { .. })));
    }
}
