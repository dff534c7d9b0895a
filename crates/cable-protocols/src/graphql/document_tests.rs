use super::*;

use DefinitionKind::{Fragment, Operation, Other};
use OperationKind::{Mutation, Query, Subscription};

#[test]
fn test_anonymous_query() {
    assert_eq!(definitions("{ products { id } }"), vec![Operation(Query)]);
}

#[test]
fn test_named_operations_in_order() {
    let doc = r#"
        query Orders { orders { id } }
        mutation PlaceOrder($input: OrderInput!) { placeOrder(input: $input) { id } }
        fragment OrderFields on Order { id status }
    "#;
    assert_eq!(
        definitions(doc),
        vec![Operation(Query), Operation(Mutation), Fragment]
    );
    assert!(!has_subscription(doc));
}

#[test]
fn test_subscription_detected() {
    let doc = "subscription OnMessage($roomId: ID!) { messageAdded(roomId: $roomId) { body } }";
    assert_eq!(definitions(doc), vec![Operation(Subscription)]);
    assert!(has_subscription(doc));
}

#[test]
fn test_subscription_after_fragment() {
    let doc = r#"
        fragment N on Notification { id }
        subscription { notificationAdded { ...N } }
    "#;
    assert!(has_subscription(doc));
}

#[test]
fn test_object_default_value_does_not_end_definition() {
    let doc = r#"query Q($f: Filter = {status: "open"}) { orders(filter: $f) { id } } subscription S { x }"#;
    assert_eq!(definitions(doc), vec![Operation(Query), Operation(Subscription)]);
}

#[test]
fn test_keywords_inside_strings_and_comments_ignored() {
    let doc = r#"
        # subscription { fake }
        query Search {
            search(term: "} subscription {") { id }
            notes(text: """
                } subscription { "quoted" \""" still inside
            """) { id }
        }
    "#;
    assert_eq!(definitions(doc), vec![Operation(Query)]);
    assert!(!has_subscription(doc));
}

#[test]
fn test_field_named_subscription_is_not_an_operation() {
    let doc = "query { subscription { plan } }";
    assert_eq!(definitions(doc), vec![Operation(Query)]);
}

#[test]
fn test_type_system_definitions_are_other() {
    let doc = "type Query { me: User } schema { query: Query }";
    assert_eq!(definitions(doc), vec![Other, Other]);
}

#[test]
fn test_empty_document() {
    assert!(definitions("").is_empty());
    assert!(definitions("   # only a comment").is_empty());
}
