use anyhow::Result;

fn main() -> Result<()> {
    shotdeck::run()?;
    Ok(())
}
