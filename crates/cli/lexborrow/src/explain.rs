//! Explain command implementation

use anyhow::{Result, anyhow};
use colored::Colorize;
use lb_borrow_check::ViolationKind;

pub fn explain(kind: &str) -> Result<()> {
    let kind: ViolationKind = kind.parse().map_err(|message: String| {
        let known: Vec<_> = ViolationKind::ALL.iter().map(|kind| kind.name()).collect();
        anyhow!("{message}; known kinds: {}", known.join(", "))
    })?;

    println!("{} [{}]", kind.name().bold(), kind.code().yellow());
    println!();
    println!("{}", kind.explanation());
    Ok(())
}
