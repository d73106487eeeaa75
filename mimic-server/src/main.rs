use std::path::Path;
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware, put, web};

use serde::{Deserialize, Serialize};

use mimic_core::error::ModelError;
use mimic_core::model::generator::{DEFAULT_MAX_TOKENS, SentenceGenerator};
use mimic_core::model::store::TransitionStore;

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	max_tokens: Option<usize>,
	retries: Option<usize>,
}

#[derive(Deserialize)]
struct CorpusQuery {
	names: Option<String>,
}

#[derive(Serialize)]
struct StatsResponse {
	contexts: usize,
	transitions: usize,
	starts: usize,
}

struct SharedData {
	store: TransitionStore,
	corpus_names: Vec<String>,
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates one sentence from the shared transition store, retrying on
/// abandoned walks. Abandonment after all retries is a 204, not an error;
/// an untrained store is a 409.
#[get("/v1/generate")]
async fn get_generated(
	data: web::Data<Mutex<SharedData>>,
	query: web::Query<GenerateParams>,
) -> impl Responder {
	let max_tokens = query.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
	let retries = query.retries.unwrap_or(5).max(1);

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Store lock failed"),
	};

	let generator = SentenceGenerator::new(&shared_data.store).with_max_tokens(max_tokens);
	for _ in 0..retries {
		match generator.generate() {
			Ok(Some(sentence)) => return HttpResponse::Ok().body(sentence),
			Ok(None) => continue,
			Err(ModelError::EmptyModel) => {
				return HttpResponse::Conflict().body("Model is empty; load a corpus first");
			}
			Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
		}
	}
	HttpResponse::NoContent().finish()
}

#[get("/v1/corpora")]
async fn get_corpora() -> impl Responder {
	match list_corpus_files("./data") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list corpora"),
	}
}

#[get("/v1/loaded")]
async fn get_loaded(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Store lock failed"),
	};
	HttpResponse::Ok().body(shared_data.corpus_names.join("\n"))
}

/// HTTP GET endpoint `/v1/stats`
///
/// Reports the size of the live store.
#[get("/v1/stats")]
async fn get_stats(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Store lock failed"),
	};
	let store = &shared_data.store;
	HttpResponse::Ok().json(StatsResponse {
		contexts: store.context_count(),
		transitions: store.transition_count(),
		starts: store.start_count(),
	})
}

/// HTTP PUT endpoint `/v1/load`
///
/// Rebuilds the shared store from the named corpora under `./data`.
/// Holding the lock for the whole rebuild keeps the single-writer
/// discipline: readers see the old store or the new one, never a
/// half-trained one.
#[put("/v1/load")]
async fn put_corpora(
	data: web::Data<Mutex<SharedData>>,
	query: web::Query<CorpusQuery>,
) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Store lock failed"),
	};

	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus name"),
	};

	let corpus_names: Vec<&str> = query_names
		.split(',')
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();

	shared_data.store = TransitionStore::new();
	shared_data.corpus_names.clear();
	for name in corpus_names {
		let corpus_path = format!("./data/{}.txt", name);
		let partial = match TransitionStore::open(&corpus_path) {
			Ok(s) => s,
			Err(e) => {
				return HttpResponse::InternalServerError()
					.body(format!("Failed to load corpus: {e}"));
			}
		};
		match shared_data.store.merge(&partial) {
			Ok(_) => shared_data.corpus_names.push(name.to_owned()),
			Err(e) => {
				return HttpResponse::InternalServerError()
					.body(format!("Failed to merge corpus: {e}"));
			}
		}
	}

	HttpResponse::Ok().body("Corpora loaded successfully")
}

/// Lists corpus files (`.txt`) in a directory, names only.
fn list_corpus_files(dir: &str) -> std::io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in std::fs::read_dir(Path::new(dir))? {
		let entry = entry?;
		let path = entry.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new("txt")) {
			if let Some(stem) = path.file_stem() {
				files.push(stem.to_string_lossy().to_string());
			}
		}
	}

	Ok(files)
}

/// Main entry point for the server.
///
/// Wraps an initially empty store in a `Mutex` for thread safety and
/// starts an Actix-web HTTP server; corpora are loaded over `/v1/load`.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - The data directory is hardcoded and should be made configurable.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let shared_data = SharedData {
		store: TransitionStore::new(),
		corpus_names: Vec::new(),
	};
	let shared_store = web::Data::new(Mutex::new(shared_data));

	log::info!("Listening on 127.0.0.1:5000");
	HttpServer::new(move || {
		App::new()
			.app_data(shared_store.clone())
			.wrap(middleware::Logger::default())
			.wrap(Cors::permissive())
			.service(get_generated)
			.service(get_corpora)
			.service(get_loaded)
			.service(get_stats)
			.service(put_corpora)
	})
	.bind(("127.0.0.1", 5000))?
	.run()
	.await
}
