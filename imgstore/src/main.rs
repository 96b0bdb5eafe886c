use clap::{ArgMatches, Command, arg, command, crate_name};

mod cli;

fn uri_arg() -> clap::Arg {
    arg!(-u --uri <URI>)
        .required(true)
        .help("Image gateway URI, e.g. http://localhost:3000")
}

fn build_cli() -> Command {
    command!(crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand(Command::new(cli::VERSION_SUBCOMMAND).about(cli::VERSION_DESCRIPTION))
        .subcommand(Command::new(cli::BUGREPORT_SUBCOMMAND).about(cli::BUGREPORT_DESCRIPTION))
        .subcommand(Command::new(cli::SERVER_SUBCOMMAND).about(cli::SERVER_DESCRIPTION))
        .subcommand(
            Command::new(cli::UPLOAD_SUBCOMMAND)
                .about(cli::UPLOAD_DESCRIPTION)
                .arg(uri_arg())
                .arg(
                    arg!(-f --file <FILE>)
                        .required(true)
                        .help("Path to image to upload"),
                ),
        )
        .subcommand(
            Command::new(cli::LIST_SUBCOMMAND)
                .about(cli::LIST_DESCRIPTION)
                .arg(uri_arg()),
        )
        .subcommand(
            Command::new(cli::DELETE_SUBCOMMAND)
                .about(cli::DELETE_DESCRIPTION)
                .arg(uri_arg())
                .arg(
                    arg!(-i --image <IMAGE_URL>)
                        .required(true)
                        .help("URL returned by upload or list"),
                ),
        )
        .arg_required_else_help(true)
        .disable_version_flag(true)
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or_default()
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some((cli::VERSION_SUBCOMMAND, _)) => cli::version::run(),
        Some((cli::BUGREPORT_SUBCOMMAND, _)) => cli::bugreport::run(),
        Some((cli::SERVER_SUBCOMMAND, _)) => cli::server::run().await,
        Some((cli::UPLOAD_SUBCOMMAND, m)) => {
            cli::client::upload(required(m, "uri"), required(m, "file")).await;
        }
        Some((cli::LIST_SUBCOMMAND, m)) => cli::client::list(required(m, "uri")).await,
        Some((cli::DELETE_SUBCOMMAND, m)) => {
            cli::client::delete(required(m, "uri"), required(m, "image")).await;
        }
        _ => {}
    }
}
