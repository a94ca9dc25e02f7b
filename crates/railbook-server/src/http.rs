//! HTTP route handling for the gateway

use std::io::Read;
use std::str::FromStr;

use railbook_core::{
    BookingError, BookingId, BookingService, JobId, JobStatus, TrainId, UserId,
};
use tiny_http::{Header, Method, Response};
use uuid::Uuid;

/// Handle one HTTP request against the booking service
pub fn handle<S: BookingService>(rq: tiny_http::Request, service: &S) {
    use Method::*;

    let url = rq.url().to_owned();
    match (rq.method(), url.as_str()) {
        (Options, _) => {
            let mut res = Response::empty(204);
            add_response_cors_headers(&mut res);
            rq.respond(res).expect("HTTP response failed");
        }
        (Post, "/api/admin/train") => add_train(rq, service),
        (Post, "/api/book") => book(rq, service),
        (Get, url) if url.starts_with("/api/availability/") => {
            availability(rq, service, &url["/api/availability/".len()..])
        }
        (Get, url) if url.starts_with("/api/job/") => {
            job_status(rq, service, &url["/api/job/".len()..])
        }
        (Get, url) if url.starts_with("/api/booking/") => {
            booking(rq, service, &url["/api/booking/".len()..])
        }
        _ => respond(
            rq,
            404,
            "🦀 could not find the service you are looking for!

Valid requests are:
  POST /api/admin/train        (body: decimal seat count)
  POST /api/book               (body: train id, header: X-User-Id)
  GET  /api/availability/<train-id>
  GET  /api/job/<job-id>
  GET  /api/booking/<booking-id>   (header: X-User-Id)",
        ),
    }
}

/// POST /api/admin/train: create a train; body is the seat count
fn add_train<S: BookingService>(mut rq: tiny_http::Request, service: &S) {
    let Some(total_seats) = read_u32(&mut rq) else {
        respond(rq, 400, "body must be a decimal seat count");
        return;
    };
    match service.add_train(total_seats) {
        Ok(train) => respond(rq, 201, train.to_string()),
        Err(err) => respond_err(rq, err),
    }
}

/// POST /api/book: admit a booking request; body is the train id
fn book<S: BookingService>(mut rq: tiny_http::Request, service: &S) {
    let Some(user) = user_id(&rq) else {
        respond(rq, 400, "X-User-Id header must be a UUID");
        return;
    };
    let Some(train) = read_id::<TrainId>(&mut rq) else {
        respond(rq, 400, "body must be a train id");
        return;
    };
    match service.submit_booking(train, user) {
        // Accepted, not allocated: the outcome lives behind /api/job/<id>.
        Ok(job) => respond(rq, 202, job.to_string()),
        Err(err) => respond_err(rq, err),
    }
}

/// GET /api/availability/<train-id>
fn availability<S: BookingService>(rq: tiny_http::Request, service: &S, raw: &str) {
    let Ok(train) = TrainId::from_str(raw) else {
        respond(rq, 400, "train id must be a UUID");
        return;
    };
    match service.seat_availability(train) {
        Ok(snap) => respond(
            rq,
            200,
            format!("{}/{}", snap.available_seats, snap.total_seats),
        ),
        Err(err) => respond_err(rq, err),
    }
}

/// GET /api/job/<job-id>
fn job_status<S: BookingService>(rq: tiny_http::Request, service: &S, raw: &str) {
    let Ok(job) = JobId::from_str(raw) else {
        respond(rq, 400, "job id must be a UUID");
        return;
    };
    match service.booking_status(job) {
        Ok(JobStatus::Queued) => respond(rq, 200, "QUEUED"),
        Ok(JobStatus::Confirmed(booking)) => respond(rq, 200, format!("CONFIRMED {booking}")),
        Ok(JobStatus::Failed(err)) => respond(rq, 200, format!("FAILED {err}")),
        Err(err) => respond_err(rq, err),
    }
}

/// GET /api/booking/<booking-id>
fn booking<S: BookingService>(rq: tiny_http::Request, service: &S, raw: &str) {
    let Some(user) = user_id(&rq) else {
        respond(rq, 400, "X-User-Id header must be a UUID");
        return;
    };
    let Ok(id) = BookingId::from_str(raw) else {
        respond(rq, 400, "booking id must be a UUID");
        return;
    };
    match service.booking(id, user) {
        Ok(b) => respond(
            rq,
            200,
            format!(
                "booking {} train {} seat {} created {}",
                b.id, b.train, b.seat_number, b.created_at
            ),
        ),
        Err(err) => respond_err(rq, err),
    }
}

/// Get the requester's id from the `X-User-Id` header
fn user_id(rq: &tiny_http::Request) -> Option<UserId> {
    for hdr in rq.headers() {
        if hdr.field.equiv("x-user-id") {
            if let Ok(id) = Uuid::parse_str(hdr.value.as_str()) {
                return Some(UserId::from_uuid(id));
            }
        }
    }
    None
}

/// Parse the request body as a decimal [`u32`]
fn read_u32(rq: &mut tiny_http::Request) -> Option<u32> {
    read_body(rq)?.trim().parse().ok()
}

/// Parse the request body as an id
fn read_id<T: FromStr>(rq: &mut tiny_http::Request) -> Option<T> {
    read_body(rq)?.trim().parse().ok()
}

fn read_body(rq: &mut tiny_http::Request) -> Option<String> {
    let mut s = String::with_capacity(rq.body_length().unwrap_or(64));
    rq.as_reader().read_to_string(&mut s).ok()?;
    Some(s)
}

/// Map a [`BookingError`] onto an HTTP status and send it
fn respond_err(rq: tiny_http::Request, err: BookingError) {
    let status = match &err {
        BookingError::Validation(_) => 400,
        BookingError::TrainNotFound
        | BookingError::BookingNotFound
        | BookingError::JobNotFound => 404,
        BookingError::SoldOut | BookingError::Contended { .. } => 409,
        BookingError::Infrastructure(_) => 503,
    };
    respond(rq, status, err.to_string());
}

fn respond(rq: tiny_http::Request, status: u16, body: impl Into<String>) {
    let mut res = Response::from_string(body.into()).with_status_code(status);
    add_response_cors_headers(&mut res);
    rq.respond(res).expect("HTTP response failed");
}

/// Add CORS headers to `res`
fn add_response_cors_headers<R: Read>(res: &mut Response<R>) {
    res.add_header(Header::from_bytes(b"Access-Control-Request-Method", b"*").unwrap());
    res.add_header(Header::from_bytes(b"Access-Control-Allow-Origin", b"*").unwrap());
    res.add_header(Header::from_bytes(b"Access-Control-Allow-Headers", b"*").unwrap());
    res.add_header(Header::from_bytes(b"Access-Control-Expose-Headers", b"*").unwrap());
}
