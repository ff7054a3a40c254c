use labbook_core::storage::{NewUser, UserRole};
use labbook_core::NotebookStore;

use crate::app::AppContext;
use crate::cli::UserCommand;
use crate::output::{print_json, users_table};

use super::print_receipt;

pub fn handle_user(ctx: &AppContext, command: &UserCommand) -> anyhow::Result<()> {
    match command {
        UserCommand::Add { name, email, role } => {
            let role: UserRole = role.parse()?;
            let mut notebook = ctx.open_notebook()?;
            let user = notebook
                .store_mut()
                .create_user(&NewUser::new(name.as_str(), email.as_str()).with_role(role))?;
            print_receipt(
                ctx,
                "Added user",
                &[("ID", user.id.to_string()), ("Role", user.role.to_string())],
            );
        }
        UserCommand::List { json } => {
            let notebook = ctx.open_notebook()?;
            let users = notebook.store().list_users()?;
            if *json {
                print_json(&users)?;
            } else if users.is_empty() {
                if !ctx.quiet() {
                    println!("No users found.");
                }
            } else {
                println!("{}", users_table(&ctx.ui_context(false), &users));
            }
        }
    }
    Ok(())
}
