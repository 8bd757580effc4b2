//! `majordome config` — Print the default configuration.

use majordome_config::AppConfig;

pub fn run(path_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_dir().join("config.toml");
    if path_only {
        println!("{}", path.display());
        return Ok(());
    }

    println!("# Default configuration — save as {}", path.display());
    println!();
    print!("{}", AppConfig::default_toml());
    Ok(())
}
