//! Set-property command handler.

use anyhow::Result;
use blockhost_core::PropertyOverlay;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Parse `key=value` assignments into an ordered overlay.
///
/// Later assignments to the same key win. Values may contain `=`.
pub fn parse_assignments(pairs: &[String]) -> Result<PropertyOverlay, CliError> {
    let mut overlay = PropertyOverlay::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CliError::Arguments(format!("expected key=value, got '{pair}'")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Arguments(format!("empty key in '{pair}'")));
        }
        overlay.set(key, value.trim());
    }
    Ok(overlay)
}

pub async fn execute(ctx: &CliContext, id: &str, pairs: &[String]) -> Result<()> {
    let overlay = parse_assignments(pairs)?;
    let merged = ctx
        .registry
        .update_properties(id, &overlay)
        .await
        .map_err(CliError::from)?;

    for (key, value) in overlay.iter() {
        println!("{key}={value}");
    }
    println!("Updated {} of {} properties for {id}.", overlay.len(), merged.len());
    if ctx.registry.is_running(id).await {
        println!("Restart the server to apply the changes.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_assignments() {
        let overlay = parse_assignments(&strings(&["motd=A=B", "pvp = false", "motd=C"])).unwrap();
        assert_eq!(overlay.get("motd"), Some("C"));
        assert_eq!(overlay.get("pvp"), Some("false"));
        assert_eq!(overlay.len(), 2);
    }

    #[test]
    fn test_missing_equals_is_rejected() {
        let err = parse_assignments(&strings(&["motd"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_empty_key_is_rejected() {
        assert!(parse_assignments(&strings(&["=value"])).is_err());
    }
}
