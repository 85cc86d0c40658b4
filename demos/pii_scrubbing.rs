use modeltrace::{PiiAction, Scrubber};
use serde_json::json;

fn main() {
    let mut scrubber = Scrubber::new(&[], PiiAction::Mask);
    scrubber.add_pattern("order_id", r"ORD-[0-9]{6}");

    let record = json!({
        "user": {
            "email": "jane@example.com",
            "contacts": [
                {"email": "a@example.com", "phone": "123-456-7890"},
                {"email": "b@example.com", "phone": "010-1234-5678"}
            ]
        },
        "message": "Your order ORD-123456 ships from 192.168.1.10"
    });

    for found in scrubber.detect(&record) {
        println!("{:12} {:24} at {}", found.category, found.value, found.path);
    }

    println!("{}", serde_json::to_string_pretty(&scrubber.process(&record)).unwrap());
}
