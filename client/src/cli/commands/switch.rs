use anyhow::bail;

use crate::Params;
use crate::utils::{create_controller, format_switch, load_settings};

pub async fn switch_command(params: Params, name: &str, on: bool) -> anyhow::Result<()> {
    let settings = load_settings(&params)?;
    let controller = create_controller(&params, &settings)?;
    let Some(switch) = controller.board().find_by_name(name) else {
        bail!(
            "No switch named '{name}', known switches: {}",
            controller.board().names().join(", ")
        );
    };
    controller.toggle(switch.id, on).await.await?;
    if let Some(switch) = controller.board().switch(switch.id) {
        println!("{}", format_switch(&switch));
    }
    println!("Status: {}", controller.board().connection_status());
    Ok(())
}
