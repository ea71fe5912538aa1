use anyhow::Context;
use log::info;
use tokio::io::BufReader;

use routerctl::event_log;
use routerctl::menu::run_menu;
use routerctl::ops::DeviceOps;
use routerctl::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    event_log::init();

    let settings = Settings::load().context("failed to load settings")?;
    info!(
        "Managing {} ({}) as {}",
        settings.device.host, settings.device.device_type, settings.device.username
    );
    let ops = DeviceOps::new(settings);

    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();
    run_menu(&ops, &mut input, &mut output)
        .await
        .context("menu I/O failed")?;
    log::logger().flush();
    Ok(())
}
