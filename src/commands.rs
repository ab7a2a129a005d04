/// Remote keys the host can send on the RemoteKey characteristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteKey {
    Rewind,
    FastForward,
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Exit,
    PlayPause,
    Information,
}

impl RemoteKey {
    /// Maps a raw HAP RemoteKey value. NEXT_TRACK and PREVIOUS_TRACK (2, 3) are not handled.
    pub fn from_hap(value: u8) -> Option<Self> {
        match value {
            0 => Some(RemoteKey::Rewind),
            1 => Some(RemoteKey::FastForward),
            4 => Some(RemoteKey::Up),
            5 => Some(RemoteKey::Down),
            6 => Some(RemoteKey::Left),
            7 => Some(RemoteKey::Right),
            8 => Some(RemoteKey::Select),
            9 => Some(RemoteKey::Back),
            10 => Some(RemoteKey::Exit),
            11 => Some(RemoteKey::PlayPause),
            15 => Some(RemoteKey::Information),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeDirection {
    Increment,
    Decrement,
}

impl VolumeDirection {
    pub fn from_hap(value: u8) -> Option<Self> {
        match value {
            0 => Some(VolumeDirection::Increment),
            1 => Some(VolumeDirection::Decrement),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandEvent {
    RemoteKey(RemoteKey),
    Volume(VolumeDirection),
    Power,
}

/// Resolves an event to the box command, or `None` when the event has no command.
pub fn resolve(event: CommandEvent) -> Option<&'static str> {
    match event {
        CommandEvent::RemoteKey(key) => match key {
            RemoteKey::Up => Some("up"),
            RemoteKey::Down => Some("down"),
            RemoteKey::Left => Some("left"),
            RemoteKey::Right => Some("right"),
            RemoteKey::Select => Some("select"),
            RemoteKey::PlayPause => Some("play"),
            RemoteKey::Information => Some("tvguide"),
            RemoteKey::Back => Some("backup"),
            RemoteKey::Rewind => Some("rewind"),
            RemoteKey::FastForward => Some("fastforward"),
            RemoteKey::Exit => None,
        },
        // Sky boxes have no volume, so the speaker buttons change channel
        CommandEvent::Volume(VolumeDirection::Increment) => Some("channelup"),
        CommandEvent::Volume(VolumeDirection::Decrement) => Some("channeldown"),
        CommandEvent::Power => Some("power"),
    }
}

/// Resolves a raw RemoteKey value as received from the host.
pub fn resolve_remote_key(value: u8) -> Option<&'static str> {
    RemoteKey::from_hap(value).and_then(|key| resolve(CommandEvent::RemoteKey(key)))
}

/// Resolves a raw VolumeSelector value as received from the host.
pub fn resolve_volume(value: u8) -> Option<&'static str> {
    VolumeDirection::from_hap(value).and_then(|direction| resolve(CommandEvent::Volume(direction)))
}

/// Key code sent on the wire for a box command.
pub fn key_code(command: &str) -> Option<u8> {
    let code = match command {
        "power" => 0,
        "select" => 1,
        "backup" | "dismiss" => 2,
        "channelup" => 6,
        "channeldown" => 7,
        "interactive" | "sidebar" => 8,
        "help" => 9,
        "services" | "search" => 10,
        "tvguide" | "home" => 11,
        "i" => 14,
        "text" => 15,
        "up" => 16,
        "down" => 17,
        "left" => 18,
        "right" => 19,
        "red" => 32,
        "green" => 33,
        "yellow" => 34,
        "blue" => 35,
        "play" => 64,
        "pause" => 65,
        "stop" => 66,
        "record" => 67,
        "fastforward" => 69,
        "rewind" => 71,
        "boxoffice" => 240,
        "sky" => 241,
        digit if digit.len() == 1 => {
            let value = digit.chars().next()?.to_digit(10)?;
            48 + value as u8
        }
        _ => return None,
    };
    Some(code)
}
