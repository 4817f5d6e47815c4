fn main() -> anyhow::Result<()> {
    pictor::run()?;
    Ok(())
}
