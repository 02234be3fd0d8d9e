// obcsim-compiler/src/parser.rs
// Two-phase parser and validator: options first, then the command sequences.

use crate::config::{
    Action, Category, Command, ConfigBuilder, Configuration, InsertError, Payload, PrintStyle,
    SequenceKind,
};
use crate::error::CompileError;
use crate::grammar::{self, RawPayload};
use crate::scanner::Line;
use once_cell::sync::Lazy;
use regex::Regex;

// Command names are spliced into C macro and buffer identifiers, so they must
// themselves be valid C identifiers.
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Opcode range reserved for user-defined commands.
const USER_OPCODES: std::ops::RangeInclusive<u64> = 0x50..=0x7F;

/// Parse the logical lines of a script into a validated configuration.
/// Fail-fast: the first scan of a rule violation aborts with no output.
pub fn parse(lines: &[Line]) -> Result<Configuration, CompileError> {
    let mut builder = ConfigBuilder::new();
    let mut index = 0;

    // Phase 1: options, up to the first sequence declaration.
    while index < lines.len() {
        let line = &lines[index];
        if first_token(&line.text) == "sequence" {
            break;
        }
        parse_option(&mut builder, line)?;
        index += 1;
    }

    // Phase 2: sequence declarations and action lines.
    let mut current: Option<SequenceKind> = None;
    let mut init_declared = false;
    let mut loop_declared = false;
    while index < lines.len() {
        let line = &lines[index];
        let tokens: Vec<&str> = line.text.split_whitespace().collect();
        let Some(&keyword) = tokens.first() else {
            index += 1;
            continue;
        };
        match keyword {
            "sequence" => {
                if tokens.len() != 2 {
                    return Err(CompileError::parse(
                        line.number,
                        "wrong number of arguments to sequence",
                    ));
                }
                let kind = SequenceKind::from_keyword(tokens[1]).ok_or_else(|| {
                    CompileError::parse(
                        line.number,
                        format!("unknown sequence \"{}\" (expected init or loop)", tokens[1]),
                    )
                })?;
                match kind {
                    SequenceKind::Init => {
                        if init_declared {
                            return Err(CompileError::semantic(
                                line.number,
                                "sequence init declared twice",
                            ));
                        }
                        if loop_declared {
                            return Err(CompileError::semantic(
                                line.number,
                                "init must come before loop",
                            ));
                        }
                        init_declared = true;
                    }
                    SequenceKind::Loop => {
                        if loop_declared {
                            return Err(CompileError::semantic(
                                line.number,
                                "sequence loop declared twice",
                            ));
                        }
                        loop_declared = true;
                    }
                }
                current = Some(kind);
            }
            "invoke" => {
                let kind = current.ok_or_else(|| {
                    CompileError::parse(line.number, "no sequence declared yet")
                })?;
                if tokens.len() < 2 {
                    return Err(CompileError::parse(line.number, "too few arguments to invoke"));
                }
                let name = tokens[1];
                let id = builder.commands.lookup(name).ok_or_else(|| {
                    CompileError::semantic(line.number, format!("command \"{}\" not found", name))
                })?;
                let payload = if tokens.len() > 2 {
                    let data = payload_text(&line.text, keyword, name);
                    let payload = parse_payload_checked(line, data)?;
                    if builder.commands.get(id).category != Category::Send {
                        return Err(CompileError::semantic(
                            line.number,
                            "only send commands can have data associated with them",
                        ));
                    }
                    Some(payload)
                } else {
                    let command = builder.commands.get(id);
                    if command.category == Category::Send && command.default_payload.is_none() {
                        return Err(CompileError::semantic(
                            line.number,
                            format!(
                                "send command \"{}\" has no default data and no data specified by the invoke",
                                name
                            ),
                        ));
                    }
                    None
                };
                builder.push_action(kind, Action::Invoke { command: id, payload });
            }
            "wait" => {
                let kind = current.ok_or_else(|| {
                    CompileError::parse(line.number, "no sequence declared yet")
                })?;
                let millis = numeric_argument(line, &tokens, "wait")?;
                if millis == 0 {
                    return Err(CompileError::semantic(
                        line.number,
                        "argument to wait must be a positive number of milliseconds",
                    ));
                }
                builder.push_action(kind, Action::Wait { millis });
            }
            other => {
                return Err(CompileError::parse(
                    line.number,
                    format!("invalid sequence action \"{}\"", other),
                ));
            }
        }
        index += 1;
    }

    builder.finish()
}

fn parse_option(builder: &mut ConfigBuilder, line: &Line) -> Result<(), CompileError> {
    let tokens: Vec<&str> = line.text.split_whitespace().collect();
    let Some(&keyword) = tokens.first() else {
        return Ok(());
    };
    match keyword {
        "setaddress" => {
            let value = numeric_argument(line, &tokens, "setaddress")?;
            if value > 0x7F {
                return Err(CompileError::semantic(
                    line.number,
                    "address must be between 0x00 and 0x7F",
                ));
            }
            if builder.address.is_some() {
                return Err(CompileError::semantic(
                    line.number,
                    "setaddress may only appear once",
                ));
            }
            builder.address = Some(value as u8);
        }
        "setmtu" => {
            let value = numeric_argument(line, &tokens, "setmtu")?;
            if value == 0 {
                return Err(CompileError::semantic(
                    line.number,
                    "MTU must be a positive integer",
                ));
            }
            if builder.mtu.is_some() {
                return Err(CompileError::semantic(
                    line.number,
                    "setmtu may only appear once",
                ));
            }
            builder.mtu = Some(value);
        }
        "setbuffersize" => {
            let value = numeric_argument(line, &tokens, "setbuffersize")?;
            if value == 0 {
                return Err(CompileError::semantic(
                    line.number,
                    "buffer size must be a positive integer",
                ));
            }
            builder.buffer_size = value;
        }
        "seterrorthreshold" => {
            let value = numeric_argument(line, &tokens, "seterrorthreshold")?;
            if value == 0 {
                return Err(CompileError::semantic(
                    line.number,
                    "error threshold must be a positive integer",
                ));
            }
            builder.error_threshold = value;
        }
        "addcommand" => {
            if tokens.len() != 3 {
                return Err(CompileError::parse(
                    line.number,
                    "wrong number of arguments to addcommand",
                ));
            }
            let name = tokens[1];
            if !IDENTIFIER.is_match(name) {
                return Err(CompileError::semantic(
                    line.number,
                    format!("command name \"{}\" is not a valid C identifier", name),
                ));
            }
            let opcode = grammar::parse_number(tokens[2]).ok_or_else(|| {
                CompileError::parse(
                    line.number,
                    "opcode argument to addcommand must be a numeric literal",
                )
            })?;
            if !USER_OPCODES.contains(&opcode) {
                return Err(CompileError::semantic(
                    line.number,
                    "opcode must be between 0x50 and 0x7F",
                ));
            }
            let command = Command::new(name, opcode as u8).ok_or_else(|| {
                CompileError::semantic(line.number, "opcode must be between 0x50 and 0x7F")
            })?;
            builder.commands.insert(command).map_err(|e| match e {
                InsertError::DuplicateName(name) => CompileError::semantic(
                    line.number,
                    format!("command \"{}\" already exists", name),
                ),
                InsertError::DuplicateOpcode(existing) => CompileError::semantic(
                    line.number,
                    format!("command \"{}\" already has that opcode", existing),
                ),
            })?;
        }
        "setdefaultdata" => {
            if tokens.len() < 3 {
                return Err(CompileError::parse(
                    line.number,
                    "too few arguments to setdefaultdata",
                ));
            }
            let name = tokens[1];
            let id = builder.commands.lookup(name).ok_or_else(|| {
                CompileError::semantic(
                    line.number,
                    format!("command \"{}\" not yet defined", name),
                )
            })?;
            if builder.commands.get(id).category != Category::Send {
                return Err(CompileError::semantic(
                    line.number,
                    "setdefaultdata only applies to send commands",
                ));
            }
            let data = payload_text(&line.text, keyword, name);
            let payload = parse_payload_checked(line, data)?;
            builder.commands.set_default_payload(id, payload);
        }
        "setprintstyle" => {
            if tokens.len() != 3 {
                return Err(CompileError::parse(
                    line.number,
                    "wrong number of arguments to setprintstyle",
                ));
            }
            let name = tokens[1];
            let id = builder.commands.lookup(name).ok_or_else(|| {
                CompileError::semantic(
                    line.number,
                    format!("command \"{}\" not yet defined", name),
                )
            })?;
            let style = PrintStyle::from_keyword(tokens[2]).ok_or_else(|| {
                CompileError::parse(
                    line.number,
                    format!("invalid print style \"{}\"", tokens[2]),
                )
            })?;
            builder.commands.set_print_style(id, style);
        }
        other => {
            return Err(CompileError::parse(
                line.number,
                format!("invalid option \"{}\"", other),
            ));
        }
    }
    Ok(())
}

/// Convert a raw payload literal into the model type, applying the range
/// rules. Syntax failures are parse errors; range violations are semantic.
fn parse_payload_checked(line: &Line, data: &str) -> Result<Payload, CompileError> {
    let raw = grammar::parse_payload(data).ok_or_else(|| {
        CompileError::parse(line.number, format!("invalid payload data: {}", data))
    })?;
    match raw {
        RawPayload::Bytes(values) => {
            let mut bytes = Vec::with_capacity(values.len());
            for value in values {
                if value > 0xFF {
                    return Err(CompileError::semantic(
                        line.number,
                        "all values in the array must be between 0x00 and 0xFF",
                    ));
                }
                bytes.push(value as u8);
            }
            Ok(Payload::Bytes(bytes))
        }
        RawPayload::Text(text) => Ok(Payload::Text(text)),
        RawPayload::Repeat { value, times } => {
            if value > 0xFF {
                return Err(CompileError::semantic(
                    line.number,
                    "the repeated value must be between 0x00 and 0xFF",
                ));
            }
            if times == 0 {
                return Err(CompileError::semantic(
                    line.number,
                    "the value must be repeated a positive number of times",
                ));
            }
            Ok(Payload::Repeat {
                value: value as u8,
                times,
            })
        }
    }
}

fn first_token(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// The remainder of a line after its keyword and command-name tokens; this is
/// the raw payload literal text.
fn payload_text<'a>(text: &'a str, keyword: &str, name: &str) -> &'a str {
    let rest = text[keyword.len()..].trim_start();
    rest[name.len()..].trim()
}

fn numeric_argument(line: &Line, tokens: &[&str], keyword: &str) -> Result<u64, CompileError> {
    if tokens.len() != 2 {
        return Err(CompileError::parse(
            line.number,
            format!("wrong number of arguments to {}", keyword),
        ));
    }
    grammar::parse_number(tokens[1]).ok_or_else(|| {
        CompileError::parse(
            line.number,
            format!("argument to {} must be a numeric literal", keyword),
        )
    })
}
