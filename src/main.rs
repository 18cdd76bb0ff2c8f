use actix_files as fs;
use actix_web::{get, middleware::Logger, web, App, HttpResponse, HttpServer, Result as ActixResult};
use clap::Parser;
use coursedocs::{PanelConfig, DEFAULT_API_BASE, DEFAULT_FILE_HOST};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Parser, Debug)]
#[command(author, version, about = "Serves the course documents panel", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Directory holding the compiled wasm bundle
    #[arg(long, default_value = "./pkg")]
    pkg_dir: String,

    /// Base URL of the document store API
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Public host used for download and preview links
    #[arg(long, default_value = DEFAULT_FILE_HOST)]
    file_host: String,

    /// Unlock upload and delete in the panel
    #[arg(long)]
    admin: bool,

    /// Enable debug logging in the browser console
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn panel_config(&self) -> PanelConfig {
        PanelConfig {
            api_base: self.api_base.clone(),
            file_host: self.file_host.clone(),
            admin: self.admin,
            debug: self.debug,
        }
    }
}

#[derive(Clone)]
struct AppState {
    config: PanelConfig,
}

// Runtime configuration for the panel
#[get("/config")]
async fn get_config(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(&data.config))
}

// Every other path gets the app shell so client-side routes resolve
async fn index() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().content_type("text/html").body(INDEX_HTML))
}

fn configure(cfg: &mut web::ServiceConfig, state: AppState, pkg_dir: &str) {
    cfg.app_data(web::Data::new(state))
        .service(get_config)
        .service(fs::Files::new("/pkg", pkg_dir))
        .default_service(web::get().to(index));
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let state = AppState {
        config: args.panel_config(),
    };

    log::info!("Serving panel at http://{}:{}", args.bind, args.port);
    log::info!("Document store: {}", state.config.api_base);
    if state.config.admin {
        log::warn!("Admin mode enabled: upload and delete are available to every visitor");
    }

    let pkg_dir = args.pkg_dir.clone();
    HttpServer::new(move || {
        let state = state.clone();
        let pkg_dir = pkg_dir.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| configure(cfg, state, &pkg_dir))
    })
    .bind((args.bind.as_str(), args.port))?
    .run()
    .await
}
