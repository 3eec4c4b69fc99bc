// SPDX-License-Identifier: MIT

//! Property tests: any `Request`/`Response` survives an `encode`/`decode`
//! round trip byte-for-byte equal to its input.

use super::*;
use proptest::prelude::*;

fn arb_query() -> impl Strategy<Value = Query> {
    prop_oneof![
        "[a-zA-Z0-9_]{1,16}".prop_map(|namespace| Query::ListKvEntries { namespace, prefix: None }),
        ("[a-zA-Z0-9_]{1,16}", "[a-zA-Z0-9_]{1,16}")
            .prop_map(|(namespace, key)| Query::GetKvEntry { namespace, key }),
        Just(Query::ListCrons),
        Just(Query::StatusOverview),
    ]
}

fn arb_request() -> impl Strategy<Value = Request> {
    prop_oneof![
        "[0-9]+\\.[0-9]+\\.[0-9]+".prop_map(|version| Request::Hello { version }),
        Just(Request::Ping),
        arb_query().prop_map(Request::Query),
        "[0-9*/,\\- ]{1,20}".prop_map(|cron| Request::TriggerScheduled { cron }),
        Just(Request::Shutdown),
    ]
}

fn arb_response() -> impl Strategy<Value = Response> {
    prop_oneof![
        Just(Response::Ok),
        Just(Response::Pong),
        Just(Response::ShuttingDown),
        any::<bool>().prop_map(|invoked| Response::Scheduled { invoked }),
        "[a-zA-Z0-9 ]{0,40}".prop_map(|message| Response::Error { message }),
    ]
}

proptest! {
    #[test]
    fn request_survives_an_encode_decode_round_trip(request in arb_request()) {
        let bytes = encode(&request).unwrap();
        let back: Request = decode(&bytes).unwrap();
        prop_assert_eq!(back, request);
    }

    #[test]
    fn response_survives_an_encode_decode_round_trip(response in arb_response()) {
        let bytes = encode(&response).unwrap();
        let back: Response = decode(&bytes).unwrap();
        prop_assert_eq!(back, response);
    }
}
