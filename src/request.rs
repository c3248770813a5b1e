//! Operation requests and their replies, as they arrive from a transport.
//!
//! JSON shape: `{"type": "ADD", "symbol": .., "side": "BUY", "price": ..,
//! "volume": .., "client_id": ..}`, `{"type": "CANCEL", "symbol": .., "order_id": ..}`,
//! `{"type": "EDIT", "symbol": .., "order_id": .., "new_volume": ..}`.

use crate::types::{NewOrder, OrderId};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Request {
    Add(NewOrder),
    Cancel(CancelRequest),
    Edit(EditRequest),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CancelRequest {
    pub symbol: String,
    #[serde(alias = "oid", alias = "orderId")]
    pub order_id: OrderId,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EditRequest {
    pub symbol: String,
    #[serde(alias = "oid", alias = "orderId")]
    pub order_id: OrderId,
    #[serde(alias = "newVolume", alias = "volume")]
    pub new_volume: u64,
}

/// ADD answers with the assigned id; CANCEL and EDIT with an acknowledgement.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Response {
    Added { order_id: OrderId },
    Ack,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClientId, Side};
    use rust_decimal::Decimal;

    #[test]
    fn parses_add_with_original_short_keys() {
        let json = r#"{"type":"ADD","symbol":"AAPL","dir":"SELL","price":101.5,"volume":100,"cid":2}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        let Request::Add(add) = req else {
            panic!("expected ADD");
        };
        assert_eq!(add.side, Side::Sell);
        assert_eq!(add.client_id, ClientId(2));
        assert_eq!(add.price, "101.5".parse::<Decimal>().unwrap());
    }

    #[test]
    fn parses_cancel_and_edit() {
        let cancel: Request = serde_json::from_str(r#"{"type":"CANCEL","symbol":"AAPL","oid":4}"#).unwrap();
        assert_eq!(
            cancel,
            Request::Cancel(CancelRequest {
                symbol: "AAPL".into(),
                order_id: OrderId(4)
            })
        );
        let edit: Request =
            serde_json::from_str(r#"{"type":"EDIT","symbol":"AAPL","order_id":4,"newVolume":10}"#).unwrap();
        assert_eq!(
            edit,
            Request::Edit(EditRequest {
                symbol: "AAPL".into(),
                order_id: OrderId(4),
                new_volume: 10
            })
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"type":"STOP","symbol":"AAPL"}"#).is_err());
    }

    #[test]
    fn response_serializes_with_type_tag() {
        let json = serde_json::to_value(Response::Added { order_id: OrderId(3) }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "ADDED", "order_id": 3}));
        let ack = serde_json::to_value(Response::Ack).unwrap();
        assert_eq!(ack, serde_json::json!({"type": "ACK"}));
    }
}
