use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::contract::{IndexRequest, IndexResponse, ReadyResponse, SearchResponse};
use crate::filters::BackendFilters;
use crate::index_service::{IndexError, IndexService};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJson,
    InvalidRequest,
    NotReady,
    InvalidQuery,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransportResponse {
    Ok { response: IndexResponse },
    Err { error: ErrorResponse },
}

pub fn handle_request(service: &dyn IndexService, request: IndexRequest) -> TransportResponse {
    match request {
        IndexRequest::CheckReady => TransportResponse::Ok {
            response: IndexResponse::Ready(ReadyResponse {
                ready: service.check_ready(),
            }),
        },
        IndexRequest::Search(search) => {
            if search.query.trim().is_empty() {
                return TransportResponse::Err {
                    error: ErrorResponse {
                        code: ErrorCode::InvalidRequest,
                        message: "query is empty".to_string(),
                    },
                };
            }
            match service.search(&search.query, &search.filters) {
                Ok(response) => TransportResponse::Ok {
                    response: IndexResponse::Search(response),
                },
                Err(error) => TransportResponse::Err {
                    error: map_index_error(error),
                },
            }
        }
    }
}

/// Serves one JSON request line and returns the JSON response line.
pub fn handle_json(service: &dyn IndexService, payload: &str) -> String {
    let response = match serde_json::from_str::<IndexRequest>(payload) {
        Ok(request) => handle_request(service, request),
        Err(error) => TransportResponse::Err {
            error: ErrorResponse {
                code: ErrorCode::InvalidJson,
                message: error.to_string(),
            },
        },
    };

    serde_json::to_string(&response).unwrap_or_else(|error| {
        format!(r#"{{"status":"err","error":{{"code":"internal","message":"{error}"}}}}"#)
    })
}

/// Answers newline-delimited requests on `stream` until the peer hangs up.
pub fn serve_connection(service: &dyn IndexService, stream: TcpStream) -> std::io::Result<()> {
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut response = handle_json(service, &line);
        response.push('\n');
        writer.write_all(response.as_bytes())?;
        writer.flush()?;
    }
    Ok(())
}

/// Accepts connections forever, one thread each.
pub fn serve(listener: TcpListener, service: Arc<dyn IndexService>) -> std::io::Result<()> {
    for stream in listener.incoming() {
        let stream = stream?;
        let service = Arc::clone(&service);
        std::thread::spawn(move || {
            let peer = stream.peer_addr().ok();
            if let Err(error) = serve_connection(service.as_ref(), stream) {
                tracing::warn!(?peer, %error, "index connection ended with error");
            }
        });
    }
    Ok(())
}

fn map_index_error(error: IndexError) -> ErrorResponse {
    match error {
        IndexError::NotReady => ErrorResponse {
            code: ErrorCode::NotReady,
            message: error.to_string(),
        },
        IndexError::InvalidQuery(message) => ErrorResponse {
            code: ErrorCode::InvalidQuery,
            message,
        },
        other => ErrorResponse {
            code: ErrorCode::Internal,
            message: other.to_string(),
        },
    }
}

/// Client for an index service that speaks the JSON-lines contract over TCP.
/// Each call opens a fresh connection.
#[derive(Debug, Clone)]
pub struct TcpIndexClient {
    endpoint: String,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl TcpIndexClient {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn from_config(config: &Config, endpoint: &str) -> Self {
        Self::new(endpoint, Duration::from_millis(config.connect_timeout_ms))
            .with_request_timeout(config.request_timeout_ms.map(Duration::from_millis))
    }

    fn round_trip(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError> {
        let address = self
            .endpoint
            .to_socket_addrs()
            .map_err(|error| IndexError::Unavailable(format!("{}: {error}", self.endpoint)))?
            .next()
            .ok_or_else(|| IndexError::Unavailable(format!("{}: no address", self.endpoint)))?;
        let stream = TcpStream::connect_timeout(&address, self.connect_timeout)
            .map_err(|error| IndexError::Unavailable(format!("{}: {error}", self.endpoint)))?;
        stream
            .set_read_timeout(self.request_timeout)
            .map_err(|error| IndexError::Unavailable(error.to_string()))?;

        let mut line =
            serde_json::to_string(request).map_err(|error| IndexError::Protocol(error.to_string()))?;
        line.push('\n');
        (&stream)
            .write_all(line.as_bytes())
            .map_err(|error| IndexError::Unavailable(error.to_string()))?;

        let mut reply = String::new();
        let read = BufReader::new(&stream)
            .read_line(&mut reply)
            .map_err(|error| IndexError::Unavailable(error.to_string()))?;
        if read == 0 {
            return Err(IndexError::Protocol("connection closed before reply".to_string()));
        }

        match serde_json::from_str::<TransportResponse>(&reply)
            .map_err(|error| IndexError::Protocol(error.to_string()))?
        {
            TransportResponse::Ok { response } => Ok(response),
            TransportResponse::Err { error } => Err(match error.code {
                ErrorCode::NotReady => IndexError::NotReady,
                ErrorCode::InvalidQuery => IndexError::InvalidQuery(error.message),
                _ => IndexError::Backend(error.message),
            }),
        }
    }
}

impl IndexService for TcpIndexClient {
    fn check_ready(&self) -> bool {
        match self.round_trip(&IndexRequest::CheckReady) {
            Ok(IndexResponse::Ready(ReadyResponse { ready })) => ready,
            Ok(other) => {
                tracing::warn!(endpoint = %self.endpoint, ?other, "unexpected readiness reply");
                false
            }
            Err(error) => {
                tracing::debug!(endpoint = %self.endpoint, %error, "readiness poll failed");
                false
            }
        }
    }

    fn search(&self, query: &str, filters: &BackendFilters) -> Result<SearchResponse, IndexError> {
        let request = IndexRequest::Search(crate::contract::SearchRequest {
            query: query.to_string(),
            filters: filters.clone(),
        });
        match self.round_trip(&request)? {
            IndexResponse::Search(response) => Ok(response),
            IndexResponse::Ready(_) => Err(IndexError::Protocol(
                "readiness reply to a search request".to_string(),
            )),
        }
    }
}
