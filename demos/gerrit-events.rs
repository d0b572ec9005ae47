use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use log::error;
use structopt::StructOpt;

use gerritevent::event::{
    ChangeAbandonedEvent, ChangeMergedEvent, ChangeRestoredEvent, CommentAddedEvent,
    PatchsetCreatedEvent, RefUpdatedEvent,
};
use gerritevent::{ConnectOptions, Dispatcher, Event, Handler, Manager, Mode, SshEventSource};

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
    /// Stop after the first connection ends instead of reconnecting
    #[structopt(long)]
    single_shot: bool,
    /// Enable verbose output
    #[structopt(short = "v")]
    verbose: bool,
}

/// Prints every event as wire-shaped json.
struct PrintHandler;

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{}", json),
        Err(err) => error!("failed to encode event: {}", err),
    }
}

impl Handler for PrintHandler {
    fn patchset_created(&mut self, event: &PatchsetCreatedEvent) {
        print_event(&Event::PatchsetCreated(event.clone()));
    }
    fn change_abandoned(&mut self, event: &ChangeAbandonedEvent) {
        print_event(&Event::ChangeAbandoned(event.clone()));
    }
    fn change_restored(&mut self, event: &ChangeRestoredEvent) {
        print_event(&Event::ChangeRestored(event.clone()));
    }
    fn change_merged(&mut self, event: &ChangeMergedEvent) {
        print_event(&Event::ChangeMerged(event.clone()));
    }
    fn comment_added(&mut self, event: &CommentAddedEvent) {
        print_event(&Event::CommentAdded(event.clone()));
    }
    fn ref_updated(&mut self, event: &RefUpdatedEvent) {
        print_event(&Event::RefUpdated(event.clone()));
    }
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
    let mode = if args.single_shot {
        Mode::SingleShot
    } else {
        Mode::Continuous
    };

    let mut dispatcher = Dispatcher::new();
    dispatcher.add_handler(Box::new(PrintHandler));

    let stop = AtomicBool::new(false);
    Manager::new(SshEventSource::new(options), mode).run(&mut dispatcher, &stop);
}
