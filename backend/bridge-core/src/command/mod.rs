//! JSON command protocol carried on the queue.
//!
//! Every envelope is a JSON object with an `action` string. Two actions are
//! understood:
//!
//! ```json
//! {"action": "select", "type": "twitch", "name": "somechannel",
//!  "attach": true, "attach_fullscreen": false,
//!  "winId": "1a2b", "yOffset": 80,
//!  "size": {"x": 0, "pixelRatio": 1.25, "width": 340, "height": 900}}
//! {"action": "detach", "winId": "1a2b"}
//! ```
//!
//! Anything else decodes to [`Command::Unknown`]. Decoding never fails.

mod fields;

use fields::Object;

use serde_json::{Map, Value, json};

pub const ACTION_SELECT: &str = "select";
pub const ACTION_DETACH: &str = "detach";

/// Default for numeric fields the sender left out.
pub const NUMBER_UNSET: i32 = -1;
/// Default for floating-point fields the sender left out.
pub const DOUBLE_UNSET: f64 = -1.0;

/// Geometry of the browser region a view attaches to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSize {
    pub x: f64,
    pub pixel_ratio: f64,
    pub width: i32,
    pub height: i32,
}

impl Default for ViewSize {
    fn default() -> Self {
        Self {
            x: DOUBLE_UNSET,
            pixel_ratio: DOUBLE_UNSET,
            width: NUMBER_UNSET,
            height: NUMBER_UNSET,
        }
    }
}

/// `select`: show a channel, optionally attached to a browser window.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCommand {
    /// Channel provider, e.g. `"twitch"`. Sent as `type`.
    pub channel_type: Option<String>,
    pub attach: bool,
    pub attach_fullscreen: bool,
    pub name: Option<String>,
    /// Browser window the view belongs to. Sent as `winId`.
    pub win_id: Option<String>,
    /// Sent as `yOffset`.
    pub y_offset: i32,
    pub size: ViewSize,
}

impl Default for SelectCommand {
    fn default() -> Self {
        Self {
            channel_type: None,
            attach: false,
            attach_fullscreen: false,
            name: None,
            win_id: None,
            y_offset: NUMBER_UNSET,
            size: ViewSize::default(),
        }
    }
}

impl SelectCommand {
    /// Whether the sender asked for any kind of window attachment.
    pub fn wants_attachment(&self) -> bool {
        self.attach || self.attach_fullscreen
    }

    /// Channel name, if present and non-empty.
    pub fn channel_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

/// `detach`: remove the view attached to a browser window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetachCommand {
    pub win_id: Option<String>,
}

/// Any other envelope, including ones that were not JSON objects at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnknownCommand {
    /// The `action` string, if there was one.
    pub action: Option<String>,
}

/// One decoded envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select(SelectCommand),
    Detach(DetachCommand),
    Unknown(UnknownCommand),
}

impl Command {
    /// Decode queue bytes. Malformed input yields [`Command::Unknown`].
    pub fn decode(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(root)) => Self::from_object(&root),
            _ => Command::Unknown(UnknownCommand::default()),
        }
    }

    fn from_object(root: &Object) -> Self {
        let action = fields::string(root, "action");

        match action.as_deref() {
            Some(ACTION_SELECT) => Command::Select(select_from(root)),
            Some(ACTION_DETACH) => Command::Detach(DetachCommand {
                win_id: fields::string(root, "winId"),
            }),
            _ => Command::Unknown(UnknownCommand { action }),
        }
    }

    /// The `action` string this command was decoded from.
    pub fn action(&self) -> Option<&str> {
        match self {
            Command::Select(_) => Some(ACTION_SELECT),
            Command::Detach(_) => Some(ACTION_DETACH),
            Command::Unknown(unknown) => unknown.action.as_deref(),
        }
    }

    /// JSON form, the inverse of [`Command::decode`]. Absent optional
    /// fields are omitted.
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        if let Some(action) = self.action() {
            root.insert("action".to_string(), json!(action));
        }

        match self {
            Command::Select(select) => {
                insert_opt(&mut root, "type", &select.channel_type);
                root.insert("attach".to_string(), json!(select.attach));
                root.insert(
                    "attach_fullscreen".to_string(),
                    json!(select.attach_fullscreen),
                );
                insert_opt(&mut root, "name", &select.name);
                insert_opt(&mut root, "winId", &select.win_id);
                root.insert("yOffset".to_string(), json!(select.y_offset));
                root.insert(
                    "size".to_string(),
                    json!({
                        "x": select.size.x,
                        "pixelRatio": select.size.pixel_ratio,
                        "width": select.size.width,
                        "height": select.size.height,
                    }),
                );
            }
            Command::Detach(detach) => insert_opt(&mut root, "winId", &detach.win_id),
            Command::Unknown(_) => {}
        }

        Value::Object(root)
    }

    /// Bytes ready for the queue.
    pub fn encode(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }
}

fn select_from(root: &Object) -> SelectCommand {
    let empty = Object::new();
    let size = fields::object(root, "size").unwrap_or(&empty);

    SelectCommand {
        channel_type: fields::string(root, "type"),
        attach: fields::boolean(root, "attach"),
        attach_fullscreen: fields::boolean(root, "attach_fullscreen"),
        name: fields::string(root, "name"),
        win_id: fields::string(root, "winId"),
        y_offset: fields::integer(root, "yOffset", NUMBER_UNSET),
        size: ViewSize {
            x: fields::double(size, "x", DOUBLE_UNSET),
            pixel_ratio: fields::double(size, "pixelRatio", DOUBLE_UNSET),
            width: fields::integer(size, "width", NUMBER_UNSET),
            height: fields::integer(size, "height", NUMBER_UNSET),
        },
    }
}

fn insert_opt(root: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        root.insert(key.to_string(), json!(value));
    }
}
