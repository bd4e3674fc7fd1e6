//! Warning and error reporting for the skeleton pass

use super::errors::ConversionError;
use super::types::{ConversionWarning, WarningKind};

/// Logs recoverable conditions and collects them, and builds fatal errors
/// tagged with the input source name and line
#[derive(Debug, Clone)]
pub struct WaeHandler {
    source_name: String,
    warnings: Vec<ConversionWarning>,
}

impl WaeHandler {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            warnings: Vec::new(),
        }
    }

    /// Record a recoverable condition. Never fails.
    pub fn warning(&mut self, kind: WarningKind, line: u32, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}:{}: {}", self.source_name, line, message);
        self.warnings.push(ConversionWarning { kind, line, message });
    }

    /// Build the fatal error for a construct the builder cannot interpret.
    /// Callers propagate it with `?`.
    pub fn error(&self, line: u32, message: impl Into<String>) -> ConversionError {
        let message = message.into();
        log::error!("{}:{}: {}", self.source_name, line, message);
        ConversionError::MusicXml {
            source_name: self.source_name.clone(),
            line,
            message,
        }
    }

    pub fn warnings(&self) -> &[ConversionWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ConversionWarning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_is_collected() {
        let mut wae = WaeHandler::new("score.xml");
        wae.warning(WarningKind::UnmatchedPartGroupStop, 12, "no open part-group 3");

        assert_eq!(wae.warnings().len(), 1);
        assert_eq!(wae.warnings()[0].line, 12);
        assert_eq!(wae.warnings()[0].kind, WarningKind::UnmatchedPartGroupStop);
    }

    #[test]
    fn test_error_carries_source_and_line() {
        let wae = WaeHandler::new("score.xml");
        let err = wae.error(7, "staff number 0 is not positive");

        assert_eq!(err.line(), Some(7));
        assert_eq!(err.to_string(), "score.xml:7: staff number 0 is not positive");
    }
}
