use anyhow::Result;

use crate::settings::{load_settings, save_settings, ENV_API_TOKEN, ENV_API_URL};

pub fn show() -> Result<()> {
    let settings = load_settings();
    let url = settings.api_base_url();
    let token = if settings.api_token().is_some() { "(set)" } else { "(not set)" };
    let order = match settings.date_order {
        crate::normalize::DateOrder::DayFirst => "day-first",
        crate::normalize::DateOrder::MonthFirst => "month-first",
    };

    println!("api_base_url:         {}", if url.is_empty() { "(not set)" } else { url.as_str() });
    println!("import_path:          {}", settings.import_path);
    println!("api_token:            {token}");
    println!("date_order:           {order}");
    println!("recent_limit:         {}", settings.recent_limit);
    println!("timeout_secs:         {}", settings.timeout_secs);
    println!("error_display_limit:  {}", settings.error_display_limit);
    println!("use_system_proxy:     {}", settings.use_system_proxy);
    if std::env::var_os(ENV_API_URL).is_some() || std::env::var_os(ENV_API_TOKEN).is_some() {
        println!();
        println!("({ENV_API_URL} / {ENV_API_TOKEN} from the environment take precedence)");
    }
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let mut settings = load_settings();
    settings.set(key, value)?;
    save_settings(&settings)?;
    println!("Updated {key}.");
    Ok(())
}
