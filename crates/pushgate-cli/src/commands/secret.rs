// `pushgate secret`: print a random value for JWT_SECRET.

use colored::Colorize;

use pushgate::crypto::generate_secret;

pub fn run() -> anyhow::Result<()> {
    let secret = generate_secret();

    println!();
    println!("Add the following to your .env file:");
    println!();
    println!("{}", "# Access token signing secret".dimmed());
    println!("{}", env_line(&secret).green());
    println!();

    Ok(())
}

fn env_line(secret: &str) -> String {
    format!("JWT_SECRET={secret}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_line() {
        let line = env_line(&generate_secret());
        assert!(line.starts_with("JWT_SECRET="));
        assert_eq!(line.len(), "JWT_SECRET=".len() + 64);
    }
}
