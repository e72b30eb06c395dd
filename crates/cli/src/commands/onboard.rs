//! `asika onboard`: first-time setup.

use asika_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Asika: First-Time Setup");
    println!("=======================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Set GROQ_API_KEY (or api_key in {})", config_path.display());
    println!("   2. Put the clinic's .txt/.md documents in the corpus directory (default ./output)");
    println!("   3. Set [dispatch] url to your registration workflow endpoint");
    println!("   4. Run: asika serve\n");

    Ok(())
}
