use crate::cli::resolve_file;
use crate::error::Result;
use crate::normalizer::normalize_sheet;
use crate::settings::{load_settings, settings_path};
use crate::sheet::read_csv;

pub fn run(file: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let path = resolve_file(&settings, file);

    println!("Settings:   {}", settings_path().display());
    println!("Budget:     {}", settings.budget_cents());
    println!("Log level:  {}", settings.log_level);
    println!("Sheet:      {}", path.display());

    if !path.exists() {
        println!();
        println!("Sheet export not found. Run `allowance init --data-file <path>` to set it.");
        return Ok(());
    }

    let sheet = read_csv(&path)?;
    let normalized = normalize_sheet(&sheet)?;
    let inactive = normalized.records.iter().filter(|r| r.inactive).count();
    let mut active_clients: Vec<&str> = normalized
        .records
        .iter()
        .filter(|r| !r.inactive)
        .map(|r| r.client_key.as_str())
        .collect();
    active_clients.sort_unstable();
    active_clients.dedup();

    println!();
    println!("Rows:                    {}", normalized.records.len());
    println!("Inactive rows:           {inactive}");
    println!("Unparseable timestamps:  {}", normalized.unparseable_timestamps);
    println!("Clients (all):           {}", normalized.directory.len());
    println!("Clients (active):        {}", active_clients.len());
    Ok(())
}
