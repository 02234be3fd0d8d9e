//! In-memory model of a validated simulator configuration.
//!
//! The parser accumulates into a [`ConfigBuilder`]; [`ConfigBuilder::finish`]
//! runs the whole-configuration checks and produces an immutable
//! [`Configuration`]. Code generation only ever sees a `Configuration`, so a
//! partially built or unvalidated model can never reach the emitters.

use crate::error::CompileError;
use std::collections::HashMap;

/// Default request buffer size when `setbuffersize` is absent.
pub const DEFAULT_BUFFER_SIZE: u64 = 4096;
/// Default MSP error threshold when `seterrorthreshold` is absent.
pub const DEFAULT_ERROR_THRESHOLD: u64 = 5;

/// Commands pre-registered before any input is read, in emission order.
const BUILTIN_COMMANDS: &[(&str, u8)] = &[
    ("ACTIVE", 0x10),
    ("SLEEP", 0x11),
    ("POWER_OFF", 0x12),
    ("REQ_PAYLOAD", 0x20),
    ("REQ_HK", 0x21),
    ("REQ_PUS", 0x22),
    ("SEND_TIME", 0x30),
    ("SEND_PUS", 0x31),
];

/// Command behavior class, derived from the opcode alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Carries no data in either direction.
    Syscommand,
    /// Requests data from the experiment; may carry a response print style.
    Request,
    /// Sends payload data to the experiment.
    Send,
}

impl Category {
    /// The category an opcode belongs to, or `None` for opcodes outside every
    /// command range (including the unassigned 0x40..=0x4F block).
    pub fn of(opcode: u8) -> Option<Category> {
        match opcode {
            0x10..=0x1F | 0x50..=0x5F => Some(Category::Syscommand),
            0x20..=0x2F | 0x60..=0x6F => Some(Category::Request),
            0x30..=0x3F | 0x70..=0x7F => Some(Category::Send),
            _ => None,
        }
    }
}

/// How the generated code prints a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStyle {
    None,
    Bytes,
    Bits,
    String,
}

impl PrintStyle {
    pub fn from_keyword(keyword: &str) -> Option<PrintStyle> {
        match keyword {
            "none" => Some(PrintStyle::None),
            "bytes" => Some(PrintStyle::Bytes),
            "bits" => Some(PrintStyle::Bits),
            "string" => Some(PrintStyle::String),
            _ => None,
        }
    }

    /// The macro spelling used by the generated invoke calls.
    pub fn as_macro(&self) -> &'static str {
        match self {
            PrintStyle::None => "NONE",
            PrintStyle::Bytes => "BYTES",
            PrintStyle::Bits => "BITS",
            PrintStyle::String => "STRING",
        }
    }
}

/// Payload data attached to a Send command, either as its configured default
/// or inline on a single invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// An explicit byte array; never empty.
    Bytes(Vec<u8>),
    /// A string, emitted as a C string literal (the NUL terminator is part of
    /// the transmitted buffer, matching the hand-written runtime).
    Text(String),
    /// A single value repeated `times` times; expressed as value plus count in
    /// the generated call, never materialized as a buffer.
    Repeat { value: u8, times: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub opcode: u8,
    pub category: Category,
    pub default_payload: Option<Payload>,
    pub print_style: PrintStyle,
}

impl Command {
    /// Create a command with the category and default print style its opcode
    /// implies. `None` if the opcode falls outside every command range.
    pub fn new(name: impl Into<String>, opcode: u8) -> Option<Command> {
        let category = Category::of(opcode)?;
        let print_style = match category {
            Category::Request => PrintStyle::Bytes,
            _ => PrintStyle::None,
        };
        Some(Command {
            name: name.into(),
            opcode,
            category,
            default_payload: None,
            print_style,
        })
    }
}

/// Handle into the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandId(usize);

/// Why a command could not be added to the table.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertError {
    DuplicateName(String),
    /// Carries the name of the command already holding the opcode.
    DuplicateOpcode(String),
}

/// The command table: one owned arena of commands plus a name index and an
/// opcode index over it. Both indices are updated together on insert, and
/// iteration always follows insertion order so generated output is byte
/// stable.
#[derive(Debug, Default, Clone)]
pub struct CommandTable {
    commands: Vec<Command>,
    by_name: HashMap<String, CommandId>,
    by_opcode: HashMap<u8, CommandId>,
}

impl CommandTable {
    pub fn insert(&mut self, command: Command) -> Result<CommandId, InsertError> {
        if self.by_name.contains_key(&command.name) {
            return Err(InsertError::DuplicateName(command.name));
        }
        if let Some(&existing) = self.by_opcode.get(&command.opcode) {
            return Err(InsertError::DuplicateOpcode(
                self.get(existing).name.clone(),
            ));
        }
        let id = CommandId(self.commands.len());
        self.by_name.insert(command.name.clone(), id);
        self.by_opcode.insert(command.opcode, id);
        self.commands.push(command);
        Ok(id)
    }

    pub fn get(&self, id: CommandId) -> &Command {
        &self.commands[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<CommandId> {
        self.by_name.get(name).copied()
    }

    pub fn lookup_opcode(&self, opcode: u8) -> Option<CommandId> {
        self.by_opcode.get(&opcode).copied()
    }

    pub fn set_default_payload(&mut self, id: CommandId, payload: Payload) {
        self.commands[id.0].default_payload = Some(payload);
    }

    pub fn set_print_style(&mut self, id: CommandId, style: PrintStyle) {
        self.commands[id.0].print_style = style;
    }

    /// Commands in insertion order: builtins first, then user commands in
    /// declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// One step of a command sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Invoke {
        command: CommandId,
        payload: Option<Payload>,
    },
    Wait {
        millis: u64,
    },
}

/// The two sequences the generated code exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Init,
    Loop,
}

impl SequenceKind {
    pub const ALL: [SequenceKind; 2] = [SequenceKind::Init, SequenceKind::Loop];

    pub fn name(&self) -> &'static str {
        match self {
            SequenceKind::Init => "init",
            SequenceKind::Loop => "loop",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<SequenceKind> {
        match keyword {
            "init" => Some(SequenceKind::Init),
            "loop" => Some(SequenceKind::Loop),
            _ => None,
        }
    }
}

/// A fully validated configuration, ready for code generation.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub address: u8,
    pub mtu: u64,
    pub buffer_size: u64,
    pub error_threshold: u64,
    pub commands: CommandTable,
    init: Vec<Action>,
    loop_: Vec<Action>,
}

impl Configuration {
    pub fn sequence(&self, kind: SequenceKind) -> &[Action] {
        match kind {
            SequenceKind::Init => &self.init,
            SequenceKind::Loop => &self.loop_,
        }
    }
}

/// Mutable accumulator for the two parse phases. Nothing downstream observes
/// it; the only way out is `finish`, which runs the aggregate checks.
#[derive(Debug)]
pub struct ConfigBuilder {
    pub address: Option<u8>,
    pub mtu: Option<u64>,
    pub buffer_size: u64,
    pub error_threshold: u64,
    pub commands: CommandTable,
    init: Vec<Action>,
    loop_: Vec<Action>,
}

impl ConfigBuilder {
    pub fn new() -> ConfigBuilder {
        let mut commands = CommandTable::default();
        for &(name, opcode) in BUILTIN_COMMANDS {
            let command = Command::new(name, opcode)
                .expect("built-in command table uses reserved opcodes");
            commands
                .insert(command)
                .expect("built-in command table has no duplicates");
        }
        ConfigBuilder {
            address: None,
            mtu: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            commands,
            init: Vec::new(),
            loop_: Vec::new(),
        }
    }

    pub fn push_action(&mut self, kind: SequenceKind, action: Action) {
        match kind {
            SequenceKind::Init => self.init.push(action),
            SequenceKind::Loop => self.loop_.push(action),
        }
    }

    /// The final consistency pass. On success the configuration is immutable
    /// from here on.
    pub fn finish(self) -> Result<Configuration, CompileError> {
        let address = self
            .address
            .ok_or_else(|| CompileError::consistency("setaddress must be among the options"))?;
        let mtu = self
            .mtu
            .ok_or_else(|| CompileError::consistency("setmtu must be among the options"))?;
        if self.buffer_size < mtu {
            return Err(CompileError::consistency(format!(
                "buffer size must be at least the MTU (buffersize = {}, mtu = {})",
                self.buffer_size, mtu
            )));
        }
        if self.init.is_empty() && self.loop_.is_empty() {
            return Err(CompileError::consistency(
                "both init and loop are empty; at least one action must be present",
            ));
        }
        Ok(Configuration {
            address,
            mtu,
            buffer_size: self.buffer_size,
            error_threshold: self.error_threshold,
            commands: self.commands,
            init: self.init,
            loop_: self.loop_,
        })
    }
}
