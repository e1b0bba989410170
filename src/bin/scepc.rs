extern crate scepc;

use scepc::cli::{Options, ScepcClient};

#[tokio::main]
async fn main() {
    let options = Options::from_args();

    let client = match ScepcClient::new(options) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            ::std::process::exit(1);
        }
    };

    if let Err(e) = client.config().init_logging() {
        eprintln!("{}", e);
        ::std::process::exit(1);
    }

    match client.enroll().await {
        Ok(outcome) => {
            eprintln!("{}", outcome);
            ::std::process::exit(outcome.exit_code());
        }
        Err(e) => {
            eprintln!("{}", e);
            ::std::process::exit(1);
        }
    }
}
