//! Request definitions
//!
//! Represents the operations a client can ask a store to perform: named hash
//! commands with positional byte-string arguments, and precompiled atomic
//! scripts invoked by identifier.

use bytes::Bytes;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    /// `PING` -> bulk "PONG"
    Ping = 0x01,
    /// `HGET name field` -> bulk or nil
    HGet = 0x02,
    /// `HSET name field value [field value ...]` -> count of new fields
    HSet = 0x03,
    /// `HSETNX name field value` -> 1 if set, 0 if the field existed
    HSetNx = 0x04,
    /// `HDEL name field [field ...]` -> count of removed fields
    HDel = 0x05,
    /// `HLEN name` -> field count
    HLen = 0x06,
    /// `HEXISTS name field` -> 1 or 0
    HExists = 0x07,
    /// `HMGET name field [field ...]` -> array of bulk or nil
    HMGet = 0x08,
    /// `HGETALL name` -> flat array of field, value pairs
    HGetAll = 0x09,
    /// `HKEYS name` -> array of fields
    HKeys = 0x0A,
    /// `HVALS name` -> array of values
    HVals = 0x0B,
    /// `HSCAN name cursor count` -> [next cursor, [field, value, ...]]
    HScan = 0x0C,
    /// `DEL name [name ...]` -> count of removed hashes
    Del = 0x0D,
    /// `EXISTS name [name ...]` -> count of existing hashes
    Exists = 0x0E,
}

impl CommandType {
    /// Command name as it appears in logs and error replies
    pub fn name(self) -> &'static str {
        match self {
            CommandType::Ping => "ping",
            CommandType::HGet => "hget",
            CommandType::HSet => "hset",
            CommandType::HSetNx => "hsetnx",
            CommandType::HDel => "hdel",
            CommandType::HLen => "hlen",
            CommandType::HExists => "hexists",
            CommandType::HMGet => "hmget",
            CommandType::HGetAll => "hgetall",
            CommandType::HKeys => "hkeys",
            CommandType::HVals => "hvals",
            CommandType::HScan => "hscan",
            CommandType::Del => "del",
            CommandType::Exists => "exists",
        }
    }

    /// Parse a command type from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        let command = match byte {
            0x01 => CommandType::Ping,
            0x02 => CommandType::HGet,
            0x03 => CommandType::HSet,
            0x04 => CommandType::HSetNx,
            0x05 => CommandType::HDel,
            0x06 => CommandType::HLen,
            0x07 => CommandType::HExists,
            0x08 => CommandType::HMGet,
            0x09 => CommandType::HGetAll,
            0x0A => CommandType::HKeys,
            0x0B => CommandType::HVals,
            0x0C => CommandType::HScan,
            0x0D => CommandType::Del,
            0x0E => CommandType::Exists,
            _ => return None,
        };
        Some(command)
    }
}

/// Atomic scripts precompiled into the store.
///
/// Every script receives the hash name as its only key and runs under the
/// store's write lock, so no other client observes an intermediate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScriptId {
    /// args: field, value -> previous value or nil
    Put = 0x01,
    /// args: field -> removed value or nil
    Remove = 0x02,
    /// args: field, value -> nil if stored, otherwise the existing value
    PutIfAbsent = 0x03,
    /// args: field, value -> previous value if the field existed, else nil
    Replace = 0x04,
    /// args: field, expected, value -> 1 if swapped, 0 otherwise
    ReplaceIfEquals = 0x05,
    /// args: field, expected -> 1 if removed, 0 otherwise
    RemoveIfEquals = 0x06,
    /// args: field, delta -> the incremented value
    AddAndGet = 0x07,
}

impl ScriptId {
    pub fn name(self) -> &'static str {
        match self {
            ScriptId::Put => "put",
            ScriptId::Remove => "remove",
            ScriptId::PutIfAbsent => "put_if_absent",
            ScriptId::Replace => "replace",
            ScriptId::ReplaceIfEquals => "replace_if_equals",
            ScriptId::RemoveIfEquals => "remove_if_equals",
            ScriptId::AddAndGet => "add_and_get",
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        let script = match byte {
            0x01 => ScriptId::Put,
            0x02 => ScriptId::Remove,
            0x03 => ScriptId::PutIfAbsent,
            0x04 => ScriptId::Replace,
            0x05 => ScriptId::ReplaceIfEquals,
            0x06 => ScriptId::RemoveIfEquals,
            0x07 => ScriptId::AddAndGet,
            _ => return None,
        };
        Some(script)
    }
}

/// A request for the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// A single named command
    Command {
        command: CommandType,
        args: Vec<Bytes>,
    },

    /// An atomic script invocation
    Script {
        script: ScriptId,
        keys: Vec<Bytes>,
        args: Vec<Bytes>,
    },
}

impl Request {
    /// Build a command request
    pub fn command(command: CommandType, args: Vec<Bytes>) -> Self {
        Request::Command { command, args }
    }

    /// Build a script request
    pub fn script(script: ScriptId, keys: Vec<Bytes>, args: Vec<Bytes>) -> Self {
        Request::Script { script, keys, args }
    }

    /// Name of the command or script, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Request::Command { command, .. } => command.name(),
            Request::Script { script, .. } => script.name(),
        }
    }
}
