#[macro_export]
macro_rules! bridge_err {
    // Case with just a message literal
    ($kind:expr, $msg:expr) => {
        BridgeError {
            kind: $kind,
            message: $msg.into(),
            file: file!(),
            line: line!(),
        }
    };
    // Case with message + format arguments
    ($kind:expr, $fmt:expr, $($args:tt)*) => {
        BridgeError {
            kind: $kind,
            message: format!($fmt, $($args)*),
            file: file!(),
            line: line!(),
        }
    };
}

#[derive(Debug)]
pub struct BridgeError {
    pub kind: BridgeErrorKind,
    pub message: String,
    pub file: &'static str,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeErrorKind {
    Serialize,
    Deserialize,
    InvalidData,

    StreamRead,
    StreamWrite,
    StreamBind,
    StreamConnect,

    BusConnect,
    BusRequest,

    ActivityNotFound,
    NotificationNotFound,
    ServiceUnavailable,

    IO,
    EnvVar,
}

impl BridgeErrorKind {
    /// Category string the host sees in `Response::Error` payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ActivityNotFound => "ACTIVITY_NOT_FOUND",
            Self::NotificationNotFound => "Notification",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::Serialize | Self::Deserialize | Self::InvalidData => "Codec",
            Self::StreamRead | Self::StreamWrite | Self::StreamBind | Self::StreamConnect => {
                "Stream"
            }
            Self::BusConnect | Self::BusRequest => "Bus",
            Self::IO | Self::EnvVar => "Internal",
        }
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}
impl std::error::Error for BridgeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_the_category_code() {
        let err = bridge_err!(
            BridgeErrorKind::NotificationNotFound,
            "Can't find this cached notification"
        );
        assert_eq!(
            err.to_string(),
            "Notification: Can't find this cached notification"
        );
    }

    #[test]
    fn format_arm_expands_arguments() {
        let err = bridge_err!(BridgeErrorKind::StreamConnect, "no socket at {}", "/tmp/x");
        assert_eq!(err.message, "no socket at /tmp/x");
        assert_eq!(err.kind.code(), "Stream");
    }
}
