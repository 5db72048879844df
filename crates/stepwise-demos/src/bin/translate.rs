//! Translator Demo
//!
//! One-shot prompt/invoke: template + provider + string parser, no loop.
//!
//! ```text
//! translate English "Tumi kemon acho?"
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stepwise_core::parser::{OutputParser, StringOutputParser};
use stepwise_core::prompt::PromptTemplate;
use stepwise_core::provider::GenerationOptions;
use stepwise_demos::provider_from_env;

const TEMPLATE: &str = "You are a translator.
Translate the following text into {language}.
Do not explain anything, do not comment. Just provide the translated text.

Example:
User's input: \"Hallo, Tumi kemon acho?\"
Your answer: \"Hello, how are you?\"

{text}
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let (Some(language), Some(text)) = (args.next(), args.next()) else {
        eprintln!("usage: translate <target language> <text>");
        std::process::exit(2);
    };

    let (provider, model) = provider_from_env();

    let prompt = PromptTemplate::from_template(TEMPLATE);
    let messages = prompt.render(&[("language", language.as_str()), ("text", text.as_str())])?;

    let options = GenerationOptions {
        model,
        temperature: 0.3,
        ..Default::default()
    };

    let completion = provider.complete(&messages, &options).await?;
    let answer = StringOutputParser.parse(&completion.content)?;

    println!("{answer}");

    Ok(())
}
