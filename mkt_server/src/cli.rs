use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 21] = [
        "RUST_LOG",
        "MKT_HOST",
        "MKT_PORT",
        "MKT_DATABASE_URL",
        "MKT_USE_X_FORWARDED_FOR",
        "MKT_USE_FORWARDED",
        "MKT_TRUST_IDENTITY_HEADERS",
        "MKT_STALE_PAYMENT_TIMEOUT",
        "MKT_CURRENCY",
        "MKT_COMMISSION_RATE",
        "MKT_PLATFORM_FEE_RATE",
        "MKT_TAX_RATE",
        "MKT_PUBLIC_URL",
        "MKT_CLIENT_URL",
        "MKT_CARD_API_BASE",
        "MKT_CARD_SIGNATURE_TOLERANCE",
        "MKT_REDIRECT_STORE_ID",
        "MKT_REDIRECT_SANDBOX",
        "MKT_REDIRECT_IPN_WHITELIST",
        "MKT_GATEWAY_TIMEOUT",
        "MKT_EMAIL_SERVICE_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
