use std::path::PathBuf;

use repost_check::app::Options;

const HELP: &str = "repost-check - Find reposts of an image across subreddits.

Usage: repost-check [OPTIONS]

  Without --subreddit/--url/--image the interactive terminal UI starts.

  --subreddit, -s NAME   Subreddit to search (repeatable)
  --url,       -u URL    Direct image URL or Reddit post URL
  --image,     -i PATH   Local image file to upload
  --api-url URL          Duplicate-check backend for this run
  --set-api-url URL      Save the backend address to the config file and exit
  --config PATH          Read configuration from PATH
  --demo                 Use canned results instead of the backend
  --version, -V          Show version and exit
  --help,    -h          Show this help message";

enum Command {
    Exit(i32),
    Run(Options),
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Command::Exit(code) => std::process::exit(code),
        Command::Run(options) => options,
    };

    match repost_check::run(options) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:?}");
            std::process::exit(1);
        }
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Command {
    let mut options = Options::default();
    let mut set_api_url = None;
    let mut args = args;

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| -> Option<String> {
            let next = args.next();
            if next.is_none() {
                eprintln!("error: {flag} needs a value\n\n{HELP}");
            }
            next
        };
        match arg.as_str() {
            "--version" | "-V" => {
                println!("repost-check {}", repost_check::VERSION);
                return Command::Exit(0);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Command::Exit(0);
            }
            "--subreddit" | "-s" => match value(&arg) {
                Some(name) => options.check.subreddits.push(name),
                None => return Command::Exit(2),
            },
            "--url" | "-u" => match value(&arg) {
                Some(url) => options.check.url = Some(url),
                None => return Command::Exit(2),
            },
            "--image" | "-i" => match value(&arg) {
                Some(path) => options.check.image = Some(PathBuf::from(path)),
                None => return Command::Exit(2),
            },
            "--api-url" => match value(&arg) {
                Some(url) => options.api_url = Some(url),
                None => return Command::Exit(2),
            },
            "--config" => match value(&arg) {
                Some(path) => options.config_file = Some(PathBuf::from(path)),
                None => return Command::Exit(2),
            },
            "--set-api-url" => match value(&arg) {
                Some(url) => set_api_url = Some(url),
                None => return Command::Exit(2),
            },
            "--demo" => options.demo = true,
            other => {
                eprintln!("error: unknown argument {other:?}\n\n{HELP}");
                return Command::Exit(2);
            }
        }
    }

    if let Some(url) = set_api_url {
        return match repost_check::config::save_base_url(options.config_file, &url) {
            Ok(path) => {
                println!("Saved api.base_url to {}", path.display());
                Command::Exit(0)
            }
            Err(err) => {
                eprintln!("error: {err:#}");
                Command::Exit(1)
            }
        };
    }

    Command::Run(options)
}
