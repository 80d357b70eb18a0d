use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path};

pub fn run(data_file: Option<String>, budget: Option<f64>, log_level: Option<String>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(file) = data_file {
        settings.data_file = shellexpand_path(&file);
    }
    if let Some(b) = budget {
        settings.budget = b;
    }
    if let Some(level) = log_level {
        settings.log_level = level;
    }

    save_settings(&settings)?;

    println!("Saved settings to {}", settings_path().display());
    println!("Sheet:   {}", settings.data_file);
    println!("Budget:  {} every 6 months", settings.budget_cents());
    Ok(())
}
