// obcsim-compiler/src/codegen/header.rs
// The declarations artifact: tunables, opcode constants, sequence prototypes.

use super::opcode_macro;
use crate::config::Configuration;

pub fn emit(config: &Configuration) -> String {
    let mut out = String::new();
    out.push_str("/* Generated by obcsimc -- do not edit */\n\n");
    out.push_str("#ifndef OBCSIM_CONFIGURATION_H\n");
    out.push_str("#define OBCSIM_CONFIGURATION_H\n\n");
    out.push_str("#include \"msp_obc.h\"\n\n");

    out.push_str(&format!("#define EXP_ADDR 0x{:02X}\n", config.address));
    out.push_str(&format!("#define EXP_MTU {}\n", config.mtu));
    out.push_str(&format!("#define REQUEST_BUFFER_SIZE {}\n", config.buffer_size));
    out.push_str(&format!("#define MSP_ERROR_THRESHOLD {}\n\n", config.error_threshold));

    // One guarded constant per command, so externally supplied definitions
    // (the MSP library defines the built-in opcodes itself) take precedence.
    for command in config.commands.iter() {
        let macro_name = opcode_macro(&command.name);
        out.push_str(&format!("#ifndef {}\n", macro_name));
        out.push_str(&format!("#define {} 0x{:02X}\n", macro_name, command.opcode));
        out.push_str("#endif\n");
    }
    out.push('\n');

    out.push_str("void sequence_init(msp_link_t *lnk);\n");
    out.push_str("void sequence_loop(msp_link_t *lnk);\n\n");

    out.push_str("#endif /* OBCSIM_CONFIGURATION_H */\n");
    out
}

#[cfg(test)]
mod tests {
    use crate::{codegen, parser, scanner};

    fn header_for(source: &str) -> String {
        let lines = scanner::scan(source).unwrap();
        codegen::emit(&parser::parse(&lines).unwrap()).header
    }

    #[test]
    fn tunables_are_rendered() {
        let header = header_for(
            "setaddress 0x1C\nsetmtu 507\nsetbuffersize 1024\nseterrorthreshold 3\n\
             sequence init\ninvoke ACTIVE\n",
        );
        assert!(header.contains("#define EXP_ADDR 0x1C\n"));
        assert!(header.contains("#define EXP_MTU 507\n"));
        assert!(header.contains("#define REQUEST_BUFFER_SIZE 1024\n"));
        assert!(header.contains("#define MSP_ERROR_THRESHOLD 3\n"));
    }

    #[test]
    fn defaults_reach_the_header() {
        let header = header_for("setaddress 1\nsetmtu 10\nsequence init\ninvoke ACTIVE\n");
        assert!(header.contains("#define REQUEST_BUFFER_SIZE 4096\n"));
        assert!(header.contains("#define MSP_ERROR_THRESHOLD 5\n"));
    }

    #[test]
    fn every_command_gets_a_guarded_opcode_constant() {
        let header = header_for(
            "setaddress 1\nsetmtu 10\naddcommand MY_CMD 0x5A\nsequence init\ninvoke MY_CMD\n",
        );
        assert!(header.contains("#ifndef MSP_OP_ACTIVE\n#define MSP_OP_ACTIVE 0x10\n#endif\n"));
        assert!(header.contains("#ifndef MSP_OP_SEND_PUS\n#define MSP_OP_SEND_PUS 0x31\n#endif\n"));
        assert!(header.contains("#ifndef MSP_OP_MY_CMD\n#define MSP_OP_MY_CMD 0x5A\n#endif\n"));
    }

    #[test]
    fn user_commands_follow_the_builtins() {
        let header = header_for(
            "setaddress 1\nsetmtu 10\naddcommand ZETA 0x50\nsequence init\ninvoke ZETA\n",
        );
        let builtin = header.find("MSP_OP_SEND_PUS").unwrap();
        let user = header.find("MSP_OP_ZETA").unwrap();
        assert!(builtin < user);
    }

    #[test]
    fn prototypes_and_include_guard() {
        let header = header_for("setaddress 1\nsetmtu 10\nsequence init\ninvoke ACTIVE\n");
        assert!(header.starts_with("/* Generated by obcsimc"));
        assert!(header.contains("void sequence_init(msp_link_t *lnk);\n"));
        assert!(header.contains("void sequence_loop(msp_link_t *lnk);\n"));
        assert!(header.ends_with("#endif /* OBCSIM_CONFIGURATION_H */\n"));
    }
}
