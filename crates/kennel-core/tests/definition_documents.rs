//! Round trips of complete definition documents through the public API.

use kennel_core::{
    EnvironmentKind, OperationSpec, ParamType, ParamValue, ProgramDefinition, replace_tokens,
};

const MINECRAFT: &str = r#"{
  "kennel": {
    "data": {
      "memory": { "value": "1024M", "display": "Max memory", "desc": "Heap passed to -Xmx" },
      "port": { "value": 25565, "type": "integer", "required": true },
      "mode": { "value": "survival", "type": "option", "options": ["survival", "creative"] },
      "eula": { "value": false, "type": "boolean" }
    },
    "install": {
      "commands": [
        { "type": "download", "files": ["https://cdn.example.com/server.jar"] },
        { "type": "mkdir", "target": "world" },
        { "type": "writefile", "target": "eula.txt", "text": "eula=%eula%" },
        { "type": "move", "source": "server.jar", "target": "bin/server.jar" },
        { "type": "command", "commands": ["chmod 0644 bin/server.jar"] }
      ]
    },
    "run": {
      "stop": "stop",
      "pre": ["echo pre"],
      "post": [],
      "program": "java",
      "arguments": ["-Xmx%memory%", "-jar", "bin/server.jar", "--port", "%port%"],
      "enabled": true,
      "autostart": true
    }
  }
}"#;

#[test]
fn test_full_document_parses_every_section() {
    let def = ProgramDefinition::from_json(MINECRAFT).unwrap();

    assert_eq!(def.data.len(), 4);
    assert_eq!(def.data["port"].kind, ParamType::Integer);
    assert!(def.data["port"].required);
    assert_eq!(def.data["mode"].options.len(), 2);
    assert_eq!(def.data["eula"].value, ParamValue::Bool(false));
    assert_eq!(def.install.commands.len(), 5);
    assert!(matches!(
        def.install.commands[3],
        OperationSpec::Move { .. }
    ));
    assert_eq!(def.run.pre, vec!["echo pre"]);
    assert!(def.run.autostart);
    assert_eq!(def.environment_kind(), EnvironmentKind::Standard);
}

#[test]
fn test_arguments_render_from_typed_values() {
    let def = ProgramDefinition::from_json(MINECRAFT).unwrap();
    let values = def.resolved_values();

    let args: Vec<String> = def
        .run
        .arguments
        .iter()
        .map(|a| replace_tokens(a, &values))
        .collect();
    assert_eq!(
        args,
        vec!["-Xmx1024M", "-jar", "bin/server.jar", "--port", "25565"]
    );
}

#[test]
fn test_saved_document_omits_empty_hooks_and_reloads() {
    let def = ProgramDefinition::from_json(MINECRAFT).unwrap();
    let json = def.to_json_pretty().unwrap();

    assert!(!json.contains("\"post\""));
    assert!(json.contains("\"pre\""));
    assert_eq!(ProgramDefinition::from_json(&json).unwrap(), def);
}
