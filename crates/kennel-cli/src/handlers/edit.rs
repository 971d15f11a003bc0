//! Edit command handler.

use kennel_core::{DataOverrides, ParamValue, ProgramData};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::program;

/// Turn `name=value` arguments into parameter edits.
///
/// Values for existing parameters stay text and are converted by the
/// parameter's declared type. New parameters get a type inferred from the
/// value. An empty value removes the parameter.
pub fn parse_assignments(
    assignments: &[String],
    existing: &ProgramData,
) -> Result<DataOverrides, CliError> {
    let mut overrides = DataOverrides::new();
    for assignment in assignments {
        let Some((name, raw)) = assignment.split_once('=') else {
            return Err(CliError::Arguments(format!(
                "expected name=value, got {assignment:?}"
            )));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(CliError::Arguments(format!(
                "missing parameter name in {assignment:?}"
            )));
        }
        let value = if raw.is_empty() {
            None
        } else if existing.contains_key(name) {
            Some(ParamValue::from(raw))
        } else {
            Some(infer(raw))
        };
        overrides.insert(name.to_string(), value);
    }
    Ok(overrides)
}

fn infer(raw: &str) -> ParamValue {
    if let Ok(flag) = raw.parse::<bool>() {
        ParamValue::Bool(flag)
    } else if let Ok(number) = raw.parse::<i64>() {
        ParamValue::Integer(number)
    } else {
        ParamValue::from(raw)
    }
}

pub fn execute(ctx: &CliContext, id: &str, assignments: &[String]) -> Result<(), CliError> {
    let program = program(ctx, id)?;
    let overrides = parse_assignments(assignments, &program.data())?;
    program.edit(overrides)?;
    println!("Updated {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{context, definition};
    use kennel_core::ProgramStore;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_assignments() {
        let existing = definition().data;
        let overrides =
            parse_assignments(&args(&["port=007", "motd=hi=there", "eula=true", "old="]), &existing)
                .unwrap();

        assert_eq!(overrides["port"], Some(ParamValue::Text("007".to_string())));
        assert_eq!(
            overrides["motd"],
            Some(ParamValue::Text("hi=there".to_string()))
        );
        assert_eq!(overrides["eula"], Some(ParamValue::Bool(true)));
        assert_eq!(overrides["old"], None);

        assert!(parse_assignments(&args(&["novalue"]), &existing).is_err());
        assert!(parse_assignments(&args(&["=1"]), &existing).is_err());
    }

    #[test]
    fn test_edit_persists_typed_value() {
        let (_dir, ctx, _factory, store) = context(&["alpha"]);

        execute(&ctx, "alpha", &args(&["port=25570"])).unwrap();
        assert_eq!(
            store.load("alpha").unwrap().data["port"].value,
            ParamValue::Integer(25570)
        );

        let err = execute(&ctx, "alpha", &args(&["port=lots"])).unwrap_err();
        assert!(matches!(err, CliError::Arguments(_)));
    }
}
