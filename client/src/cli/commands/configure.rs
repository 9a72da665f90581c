use irrigation_client_rs::SettingsStore;

use crate::Params;
use crate::utils::load_settings;

pub fn configure(params: Params, names: Vec<(usize, String)>) -> anyhow::Result<()> {
    let mut settings = load_settings(&params)?;
    for (index, name) in names {
        settings.set_switch_name(index, name);
    }
    settings.has_configured = settings.is_complete();
    SettingsStore::new(&params.settings).save(&settings)?;

    println!("Settings saved to {}", params.settings.display());
    for (index, name) in settings.names().iter().enumerate() {
        println!("  {}: {name}", index + 1);
    }
    if !settings.has_configured {
        println!("Host, user and password are still required");
    }
    Ok(())
}
