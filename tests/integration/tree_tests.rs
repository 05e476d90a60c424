//! Control tree integration tests: builder, path addressing, structural
//! dump and concurrent access through `SharedGui`.

use std::sync::{Arc, Mutex};
use std::thread;

use bleremote::gui::{GuiBuilder, SharedGui};
use bleremote::handler::{DataHandler, FnHandler, RefHandler, ValueCell};
use bleremote::value::{Rgbw, Value};

fn demo() -> SharedGui {
    SharedGui::new(
        GuiBuilder::new()
            .group("Cabin")
            .collapsible(false)
            .color_field("Light", ValueCell::shared(Rgbw::new(1, 2, 3, 4)), "RGBW")
            .radio("Scene", &["Day", "Night"], ValueCell::shared(1))
            .group("Advanced")
            .collapsible(true)
            .number_field("Offset", ValueCell::shared(-5))
            .read_only()
            .end_group()
            .end_group()
            .checkbox("Power", ValueCell::shared(false))
            .advanced()
            .build(),
    )
}

#[test]
fn dump_matches_client_format() {
    let tree: serde_json::Value = serde_json::from_str(&demo().describe()).unwrap();
    assert_eq!(
        tree,
        serde_json::json!({
            "type": "root",
            "name": "",
            "elements": [
                {
                    "type": "group",
                    "name": "Cabin",
                    "collapsed": false,
                    "elements": [
                        {"type": "RGBWRange", "name": "Light", "channel": "RGBW",
                         "value": Rgbw::new(1, 2, 3, 4).packed()},
                        {"type": "radio", "name": "Scene", "items": ["Day", "Night"], "value": 1},
                        {
                            "type": "group",
                            "name": "Advanced",
                            "collapsed": true,
                            "elements": [
                                {"type": "numberfield_int32", "name": "Offset",
                                 "value": -5, "readOnly": true}
                            ]
                        }
                    ]
                },
                {"type": "checkbox", "name": "Power", "advanced": true, "value": 0}
            ]
        })
    );
}

#[test]
fn nested_paths_read_and_write() {
    let gui = demo();
    let offset = ["Cabin", "Advanced", "Offset"];
    assert_eq!(gui.get_value(&offset), Some(Value::Integer(-5)));
    // readOnly is a presentation hint; writes still land.
    assert!(gui.set_value(&offset, &Value::Integer(12)));
    assert_eq!(gui.get_value(&offset), Some(Value::Integer(12)));

    assert!(gui.set_value(&["Cabin", "Light"], &Value::Integer(0x0A11_2233)));
    assert_eq!(
        gui.get_value(&["Cabin", "Light"]),
        Some(Value::Color(Rgbw::from_packed(0x0A11_2233)))
    );

    assert_eq!(gui.get_value(&["Cabin"]), None);
    assert_eq!(gui.get_value::<&str>(&[]), None);
    assert!(!gui.set_value(&["Cabin", "Advanced"], &Value::Integer(1)));
    assert!(!gui.set_value(&["Power", "x"], &Value::Boolean(true)));
}

#[test]
fn handlers_bind_to_application_state() {
    let level = Arc::new(Mutex::new(3));
    let changes = Arc::new(Mutex::new(0));
    let c = changes.clone();
    let doubled = Arc::new(Mutex::new(0));
    let (get_d, set_d) = (doubled.clone(), doubled.clone());

    let gui = SharedGui::new(
        GuiBuilder::new()
            .range(
                "Level",
                0,
                10,
                RefHandler::shared(level.clone(), move || *c.lock().unwrap() += 1),
            )
            .range(
                "Double",
                0,
                100,
                Arc::new(FnHandler::new(
                    move || *get_d.lock().unwrap() * 2,
                    move |v: i32| *set_d.lock().unwrap() = v / 2,
                )),
            )
            .build(),
    );

    assert!(gui.set_value(&["Level"], &Value::Integer(8)));
    assert_eq!(*level.lock().unwrap(), 8);
    assert_eq!(*changes.lock().unwrap(), 1);

    *level.lock().unwrap() = 2;
    assert_eq!(gui.get_value(&["Level"]), Some(Value::Integer(2)));

    assert!(gui.set_value(&["Double"], &Value::Integer(40)));
    assert_eq!(*doubled.lock().unwrap(), 20);
    assert_eq!(gui.get_value(&["Double"]), Some(Value::Integer(40)));
}

#[test]
fn concurrent_writers_see_consistent_tree() {
    let counter = ValueCell::shared(0);
    let gui = SharedGui::new(
        GuiBuilder::new()
            .number_field("Count", counter.clone())
            .build(),
    );

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let gui = gui.clone();
            thread::spawn(move || {
                for _ in 0..250 {
                    gui.with_root(|root| {
                        let current = bleremote::gui::element::get_in_group(root, &["Count"])
                            .map_or(0, |v| v.as_integer());
                        bleremote::gui::element::set_in_group(
                            root,
                            &["Count"],
                            &Value::Integer(current + 1),
                        )
                    });
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(counter.get(), 1000);
}
