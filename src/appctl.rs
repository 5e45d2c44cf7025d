use std::sync::{Mutex, atomic::{AtomicBool, Ordering}};
use bus::{Bus, BusReader};
use crossbeam_channel::{unbounded, Receiver, Sender};
use uuid::Uuid;

use crate::classy::{Assessment, ClassifyError};
use crate::Error;

/// Texts to classify against one threshold.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: Uuid,
    pub inputs: Vec<Vec<u8>>,
    pub threshold: f64,
}

impl Request {
    pub fn new(inputs: Vec<Vec<u8>>, threshold: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            inputs,
            threshold,
        }
    }
}

/// One outcome per input of the request with the same id.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: Uuid,
    pub outcomes: Vec<Result<Assessment, ClassifyError>>,
}

pub struct AppCtl{
    alive: AtomicBool,
    ready: AtomicBool,
    send_request: Sender<Request>,
    get_request: Receiver<Request>,
    response_channel: Mutex<Bus<Response>>,
}

impl AppCtl {
    pub fn new() -> Self {
        let (send_request, get_request) = unbounded();
        Self {
            alive: AtomicBool::new(true),
            ready: AtomicBool::new(false),
            send_request,
            get_request,
            response_channel: Mutex::new(Bus::new(1000)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn send_request(&self, request: Request) -> Result<(), Error> {
        self.send_request.send(request).map_err(|_| Error::AnalyzerGone)
    }

    pub fn listen_requests(&self) -> Receiver<Request> {
        self.get_request.clone()
    }

    pub fn broadcast_response(&self, response: Response) {
        let mut response_channel = self.response_channel.lock().unwrap();
        response_channel.broadcast(response);
    }

    /// Only responses broadcast after this call are seen.
    pub fn listen_responses(&self) -> BusReader<Response> {
        let mut response_channel = self.response_channel.lock().unwrap();
        response_channel.add_rx()
    }
}
