/// Instantaneous state reported by a five-button Pico remote's sensor.
///
/// The sensor carries the currently pressed button as a numeric state
/// value, with 0 meaning the remote is at rest. The values are fixed by
/// the remote hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum ButtonCode {
    Idle = 0,
    On = 1,
    Center = 2,
    Off = 4,
    Up = 8,
    Down = 16,
}

/// A sensor state value outside the dispatch table.
///
/// Fatal to the invocation that observed it, not to the controller: the
/// watch loop logs it and keeps listening.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized button code: {0:?}")]
pub struct UnrecognizedCode(pub String);

impl ButtonCode {
    /// Parse a sensor state value into a button code.
    pub fn parse(state: &str) -> Result<Self, UnrecognizedCode> {
        let raw: u8 = state
            .trim()
            .parse()
            .map_err(|_| UnrecognizedCode(state.to_string()))?;

        Self::from_repr(raw).ok_or_else(|| UnrecognizedCode(state.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_codes() {
        assert_eq!(ButtonCode::parse("0"), Ok(ButtonCode::Idle));
        assert_eq!(ButtonCode::parse("1"), Ok(ButtonCode::On));
        assert_eq!(ButtonCode::parse("2"), Ok(ButtonCode::Center));
        assert_eq!(ButtonCode::parse("4"), Ok(ButtonCode::Off));
        assert_eq!(ButtonCode::parse("8"), Ok(ButtonCode::Up));
        assert_eq!(ButtonCode::parse("16"), Ok(ButtonCode::Down));
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        assert_eq!(ButtonCode::parse(" 2 "), Ok(ButtonCode::Center));
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert_eq!(
            ButtonCode::parse("3"),
            Err(UnrecognizedCode("3".to_string()))
        );
        assert_eq!(
            ButtonCode::parse("32"),
            Err(UnrecognizedCode("32".to_string()))
        );
        assert_eq!(
            ButtonCode::parse("unavailable"),
            Err(UnrecognizedCode("unavailable".to_string()))
        );
        assert_eq!(ButtonCode::parse(""), Err(UnrecognizedCode(String::new())));
    }
}
