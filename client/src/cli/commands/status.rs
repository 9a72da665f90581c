use futures::future::join_all;

use crate::Params;
use crate::utils::{create_controller, load_settings, print_board};

pub async fn status(params: Params) -> anyhow::Result<()> {
    let settings = load_settings(&params)?;
    let controller = create_controller(&params, &settings)?;
    for result in join_all(controller.refresh_all_statuses()).await {
        result?;
    }
    print_board(controller.board());
    Ok(())
}
