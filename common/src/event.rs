use serde::{Deserialize, Serialize};

/// Normalized notification payload shared between the daemon and its
/// clients.
///
/// One instance is built per listener callback and never mutated after
/// that. Field names serialize in the camelCase form the host sees on
/// the event stream.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: u32,
    pub package_name: String,
    pub app_name: String,
    /// Arrival time, unix milliseconds.
    pub post_time: i64,
    pub can_reply: bool,
    pub group_key: Option<String>,
    pub is_group_summary: bool,
    pub title: Option<String>,
    pub content: Option<String>,
    /// True only for events built on the removal path. Active-set
    /// snapshots are always false.
    pub is_removed: bool,
    pub have_extra_picture: bool,
    pub app_icon: Option<Vec<u8>>,
    pub large_icon: Option<Vec<u8>>,
    #[serde(rename = "notificationExtrasPicture")]
    pub extras_picture: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let event = NotificationEvent {
            id: 7,
            package_name: "org.example.chat".into(),
            app_name: "Chat".into(),
            post_time: 1_700_000_000_000,
            can_reply: true,
            ..Default::default()
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["packageName"], "org.example.chat");
        assert_eq!(json["appName"], "Chat");
        assert_eq!(json["postTime"], 1_700_000_000_000i64);
        assert_eq!(json["canReply"], true);
        assert_eq!(json["isRemoved"], false);
        assert!(json.get("notificationExtrasPicture").is_some());
        assert!(json.get("extras_picture").is_none());
    }
}
