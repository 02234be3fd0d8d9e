// obcsim-compiler/src/codegen/sequence.rs
// The implementation artifact: payload buffers plus one function per sequence.

use super::{command_buffer_name, invocation_buffer_name, opcode_macro};
use crate::config::{Action, Category, Command, Configuration, Payload, SequenceKind};

pub fn emit(config: &Configuration) -> String {
    let mut out = String::new();
    out.push_str("/* Generated by obcsimc -- do not edit */\n\n");
    out.push_str("#include \"Arduino.h\"\n");
    out.push_str("#include \"obcsim_configuration.hpp\"\n");
    out.push_str("#include \"obcsim_transactions.hpp\"\n\n");

    // Buffers for command default payloads, then for inline invocation
    // payloads. Repeat payloads are value plus count and get no buffer.
    for command in config.commands.iter() {
        if let Some(payload) = &command.default_payload {
            if let Some(decl) = buffer_declaration(&command_buffer_name(&command.name), payload) {
                out.push_str(&decl);
                out.push('\n');
            }
        }
    }
    for kind in SequenceKind::ALL {
        for (index, action) in config.sequence(kind).iter().enumerate() {
            if let Action::Invoke {
                payload: Some(payload),
                ..
            } = action
            {
                if let Some(decl) =
                    buffer_declaration(&invocation_buffer_name(kind, index), payload)
                {
                    out.push_str(&decl);
                    out.push('\n');
                }
            }
        }
    }
    out.push('\n');

    for kind in SequenceKind::ALL {
        emit_sequence(&mut out, config, kind);
    }
    out
}

fn buffer_declaration(name: &str, payload: &Payload) -> Option<String> {
    match payload {
        Payload::Bytes(values) => {
            let body = values
                .iter()
                .map(|v| format!("0x{:02X}", v))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("static unsigned char {}[] = {{{}}};", name, body))
        }
        Payload::Text(text) => Some(format!("static unsigned char {}[] = \"{}\";", name, text)),
        Payload::Repeat { .. } => None,
    }
}

fn emit_sequence(out: &mut String, config: &Configuration, kind: SequenceKind) {
    out.push_str(&format!("void sequence_{}(msp_link_t *lnk)\n{{\n", kind.name()));
    for (index, action) in config.sequence(kind).iter().enumerate() {
        match action {
            Action::Wait { millis } => {
                out.push_str(&format!("\tdelay({});\n", millis));
            }
            Action::Invoke { command, payload } => {
                let command = config.commands.get(*command);
                let banner = format!("-------- Invoking {} --------", command.name);
                out.push_str(&format!("\tSerial.println(\"{}\");\n", banner));
                out.push_str(&invoke_call(command, payload.as_ref(), kind, index));
                out.push_str(&format!(
                    "\tSerial.println(\"{}\\n\");\n",
                    "-".repeat(banner.len())
                ));
            }
        }
    }
    out.push_str("}\n\n");
}

/// The category-dispatched transaction call for one invocation. For send
/// commands the inline payload wins over the command default.
fn invoke_call(
    command: &Command,
    inline: Option<&Payload>,
    kind: SequenceKind,
    index: usize,
) -> String {
    let opcode = opcode_macro(&command.name);
    let style = command.print_style.as_macro();
    match command.category {
        Category::Syscommand => format!("\tinvoke_syscommand(lnk, {});\n", opcode),
        Category::Request => format!("\tinvoke_request(lnk, {}, {});\n", opcode, style),
        Category::Send => match inline.or(command.default_payload.as_ref()) {
            Some(Payload::Repeat { value, times }) => format!(
                "\tinvoke_send_repeat(lnk, {}, 0x{:02X}, {}, {});\n",
                opcode, value, times, style
            ),
            Some(_) => {
                let buffer = if inline.is_some() {
                    invocation_buffer_name(kind, index)
                } else {
                    command_buffer_name(&command.name)
                };
                format!(
                    "\tinvoke_send(lnk, {}, {}, sizeof({}), {});\n",
                    opcode, buffer, buffer, style
                )
            }
            // Validation guarantees a send invocation always has data.
            None => String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::{codegen, parser, scanner};

    fn source_for(script: &str) -> String {
        let lines = scanner::scan(script).unwrap();
        codegen::emit(&parser::parse(&lines).unwrap()).source
    }

    const PRELUDE: &str = "setaddress 0x11\nsetmtu 507\n";

    #[test]
    fn default_byte_array_payload_becomes_a_command_buffer() {
        let source = source_for(&format!(
            "{}addcommand SEND_CMD 0x70\nsetdefaultdata SEND_CMD {{0x01, 0x02}}\n\
             sequence init\ninvoke SEND_CMD\n",
            PRELUDE
        ));
        assert!(source.contains("static unsigned char data_cmd_SEND_CMD[] = {0x01, 0x02};\n"));
        assert!(source.contains(
            "\tinvoke_send(lnk, MSP_OP_SEND_CMD, data_cmd_SEND_CMD, sizeof(data_cmd_SEND_CMD), NONE);\n"
        ));
    }

    #[test]
    fn inline_payload_becomes_an_invocation_buffer() {
        let source = source_for(&format!(
            "{}sequence init\nwait 100\ninvoke SEND_TIME {{3}}\n",
            PRELUDE
        ));
        // The invoke is the second action, so the buffer is indexed 1.
        assert!(source.contains("static unsigned char data_seq_init_1[] = {0x03};\n"));
        assert!(source.contains(
            "\tinvoke_send(lnk, MSP_OP_SEND_TIME, data_seq_init_1, sizeof(data_seq_init_1), NONE);\n"
        ));
    }

    #[test]
    fn inline_payload_wins_over_the_default() {
        let source = source_for(&format!(
            "{}addcommand SEND_CMD 0x70\nsetdefaultdata SEND_CMD {{1}}\n\
             sequence init\ninvoke SEND_CMD {{2, 3}}\n",
            PRELUDE
        ));
        assert!(source.contains("static unsigned char data_cmd_SEND_CMD[] = {0x01};\n"));
        assert!(source.contains("static unsigned char data_seq_init_0[] = {0x02, 0x03};\n"));
        assert!(source.contains("invoke_send(lnk, MSP_OP_SEND_CMD, data_seq_init_0,"));
    }

    #[test]
    fn repeat_payload_never_materializes_a_buffer() {
        let source = source_for(&format!(
            "{}sequence init\ninvoke SEND_TIME repeat(0x41, 5)\n",
            PRELUDE
        ));
        assert!(source.contains(
            "\tinvoke_send_repeat(lnk, MSP_OP_SEND_TIME, 0x41, 5, NONE);\n"
        ));
        assert!(!source.contains("data_seq_init_0"));
    }

    #[test]
    fn string_payload_renders_a_c_string_literal() {
        let source = source_for(&format!(
            "{}addcommand SEND_CMD 0x70\nsetdefaultdata SEND_CMD \"ping\"\n\
             sequence init\ninvoke SEND_CMD\n",
            PRELUDE
        ));
        assert!(source.contains("static unsigned char data_cmd_SEND_CMD[] = \"ping\";\n"));
    }

    #[test]
    fn syscommand_and_request_calls() {
        let source = source_for(&format!(
            "{}setprintstyle REQ_HK bits\nsequence init\ninvoke ACTIVE\ninvoke REQ_HK\ninvoke REQ_PUS\n",
            PRELUDE
        ));
        assert!(source.contains("\tinvoke_syscommand(lnk, MSP_OP_ACTIVE);\n"));
        assert!(source.contains("\tinvoke_request(lnk, MSP_OP_REQ_HK, BITS);\n"));
        // Request commands default to the bytes print style.
        assert!(source.contains("\tinvoke_request(lnk, MSP_OP_REQ_PUS, BYTES);\n"));
    }

    #[test]
    fn wait_renders_a_delay() {
        let source = source_for(&format!("{}sequence loop\nwait 2500\n", PRELUDE));
        assert!(source.contains("void sequence_loop(msp_link_t *lnk)\n{\n\tdelay(2500);\n}\n"));
    }

    #[test]
    fn invocations_are_bracketed_by_banner_and_separator() {
        let source = source_for(&format!("{}sequence init\ninvoke ACTIVE\n", PRELUDE));
        let banner = "-------- Invoking ACTIVE --------";
        assert!(source.contains(&format!("\tSerial.println(\"{}\");\n", banner)));
        assert!(source.contains(&format!(
            "\tSerial.println(\"{}\\n\");\n",
            "-".repeat(banner.len())
        )));
    }

    #[test]
    fn an_undeclared_sequence_still_gets_an_empty_function() {
        let source = source_for(&format!("{}sequence init\ninvoke ACTIVE\n", PRELUDE));
        assert!(source.contains("void sequence_loop(msp_link_t *lnk)\n{\n}\n"));
    }

    #[test]
    fn actions_render_in_declaration_order() {
        let source = source_for(&format!(
            "{}sequence init\ninvoke ACTIVE\nwait 100\ninvoke SLEEP\n",
            PRELUDE
        ));
        let active = source.find("MSP_OP_ACTIVE);").unwrap();
        let delay = source.find("delay(100)").unwrap();
        let sleep = source.find("MSP_OP_SLEEP);").unwrap();
        assert!(active < delay && delay < sleep);
    }
}
