use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use structopt::StructOpt;

use gerritevent::redmine::{RedmineConfig, RedmineHandler, DEFAULT_COMMENT_TEMPLATE};
use gerritevent::{ConnectOptions, Dispatcher, Manager, Mode, SshEventSource};

/// Posts gerrit review comments as notes on the referenced Redmine issues.
#[derive(StructOpt, Debug)]
struct Args {
    /// Gerrit username
    #[structopt(short = "u")]
    username: String,
    /// Gerrit hostname
    hostname: String,
    /// Gerrit SSH port
    #[structopt(short = "p", default_value = "29418")]
    port: u16,
    /// Path to SSH private key
    #[structopt(short = "i", parse(from_os_str))]
    private_key_path: PathBuf,
    /// Redmine issue URL template, `{}` is replaced by the issue id
    #[structopt(long)]
    issue_url: String,
    /// Redmine API key
    #[structopt(long)]
    api_key: String,
    /// Enable verbose output
    #[structopt(short = "v")]
    verbose: bool,
}

fn main() {
    let args = Args::from_args();
    stderrlog::new()
        .module(module_path!())
        .module("gerritevent")
        .timestamp(stderrlog::Timestamp::Second)
        .verbosity(if args.verbose { 5 } else { 2 })
        .init()
        .unwrap();

    let options = ConnectOptions {
        host: args.hostname,
        port: args.port,
        username: args.username,
        private_key_path: Some(args.private_key_path),
        password: None,
    };
    let handler = RedmineHandler::new(RedmineConfig {
        issue_url: args.issue_url,
        api_key: args.api_key,
        comment_template: DEFAULT_COMMENT_TEMPLATE.to_string(),
    });

    let mut dispatcher = Dispatcher::new();
    dispatcher.add_handler(Box::new(handler));

    let stop = AtomicBool::new(false);
    Manager::new(SshEventSource::new(options), Mode::Continuous).run(&mut dispatcher, &stop);
}
