use labbook_core::storage::{NewUser, UserRole};
use labbook_core::{Notebook, NotebookStore};

use crate::app::{resolve_config_path, AppContext};
use crate::cli::InitArgs;
use crate::config::{write_config, LabbookConfig};

use super::print_receipt;

pub fn handle_init(ctx: &AppContext, args: &InitArgs) -> anyhow::Result<()> {
    let config_path = resolve_config_path()?;
    let data_dir = ctx.data_dir()?;

    let mut notebook = Notebook::open(&data_dir)?;
    tracing::info!(data_dir = %data_dir.display(), "notebook initialized");

    let user = match (&args.name, &args.email) {
        (Some(name), Some(email)) => Some(
            notebook
                .store_mut()
                .create_user(&NewUser::new(name.as_str(), email.as_str()).with_role(UserRole::Admin))?,
        ),
        _ => None,
    };

    let config_written = if config_path.exists() && !args.force {
        false
    } else {
        let config = LabbookConfig::new(&data_dir, user.as_ref().map(|u| u.id));
        write_config(&config_path, &config)?;
        true
    };

    let mut items = vec![
        ("Data dir", data_dir.display().to_string()),
        (
            "Config",
            if config_written {
                config_path.display().to_string()
            } else {
                format!("{} (kept)", config_path.display())
            },
        ),
    ];
    if let Some(user) = user {
        items.push(("User", user.id.to_string()));
    }
    print_receipt(ctx, "Initialized notebook", &items);
    Ok(())
}
