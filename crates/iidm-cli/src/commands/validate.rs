use std::path::PathBuf;

use anyhow::{bail, Result};
use iidm_core::IidmError;
use iidm_io::{validate_path, ExtensionRegistry};

pub fn handle(inputs: &[PathBuf]) -> Result<()> {
    let registry = ExtensionRegistry::default();
    let mut failed = 0;
    for input in inputs {
        match validate_path(input, &registry) {
            Ok(()) => println!("{}: valid", input.display()),
            Err(IidmError::StructuralValidation(violations)) => {
                failed += 1;
                println!("{}: {} violation(s)", input.display(), violations.len());
                for violation in &violations {
                    println!("  {violation}");
                }
            }
            Err(e) => {
                failed += 1;
                println!("{}: {e}", input.display());
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} document(s) failed validation", inputs.len());
    }
    Ok(())
}
