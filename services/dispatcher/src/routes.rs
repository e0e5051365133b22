//! API routing table (§4.2): prefix match on the request path, translating
//! each shape into an upstream invocation (or an admin action).

use proxy_wire::request_record::{GenericElement, RequestKind, RequestPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInvocation {
    pub kind: RequestKind,
    pub dest: String,
    pub op: String,
    pub payload: RequestPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Test,
    Restart,
    Kill,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Invoke(PendingInvocation),
    ServerStatus,
    WorkerAdmin { index: usize, action: AdminAction },
}

/// `/list/...` accepts at most this many ids (§8: "more than 30 ids ⇒ 400").
const MAX_LIST_IDS: usize = 30;

/// Matches `path` against the routing table. `Err(())` means the path is
/// malformed or matches no known route shape (→ 400 at the caller).
pub fn parse_route(path: &str) -> Result<Route, ()> {
    let path = path.split('?').next().unwrap_or(path);
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match segments.as_slice() {
        ["player", name] => Ok(invoke(
            RequestKind::Str,
            "summonerService",
            "getSummonerByName",
            RequestPayload::Str(decode_spaces(name)),
        )),
        ["player", name, "inGame"] => Ok(invoke(
            RequestKind::Str,
            "gameService",
            "retrieveInProgressSpectatorGameInfo",
            RequestPayload::Str(decode_spaces(name)),
        )),
        ["accountid", n, "recentGames"] => numeric_route(n, "playerStatsService", "getRecentGames"),
        ["accountid", n, "allPublicData"] => {
            numeric_route(n, "summonerService", "getAllPublicSummonerDataByAccount")
        }
        ["accountid", n, "stats"] => {
            numeric_route(n, "playerStatsService", "retrievePlayerStatsByAccountId")
        }
        ["accountid", n, "topPlayed"] => {
            let id = parse_u32(n)?;
            Ok(invoke(
                RequestKind::Generic,
                "playerStatsService",
                "retrieveTopPlayedChampions",
                RequestPayload::Generic(vec![
                    GenericElement::Numeric(id),
                    GenericElement::Str("CLASSIC".to_owned()),
                ]),
            ))
        }
        ["accountid", n, "rankedStats", s] => {
            let id = parse_u32(n)?;
            if s.len() != 1 || !s.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                return Err(());
            }
            let queue = parse_u32(s)?;
            Ok(invoke(
                RequestKind::Generic,
                "playerStatsService",
                "getAggregatedStats",
                RequestPayload::Generic(vec![
                    GenericElement::Numeric(id),
                    GenericElement::Str("CLASSIC".to_owned()),
                    GenericElement::Numeric(queue),
                ]),
            ))
        }
        ["summonerid", n, "leagues"] => {
            numeric_route(n, "leaguesServiceProxy", "getAllLeaguesForPlayer")
        }
        ["summonerid", n, "honor"] => {
            let id = parse_u32(n)?;
            let json = format!(r#"{{"commandName":"TOTALS","summonerId":{}}}"#, id);
            Ok(invoke(
                RequestKind::Str,
                "clientFacadeService",
                "callKudos",
                RequestPayload::Str(json),
            ))
        }
        ["summonerid", n, "runes"] => numeric_route(n, "spellBookService", "getSpellBook"),
        ["summonerid", n, "masteries"] => numeric_route(n, "masteryBookService", "getMasteryBook"),
        ["list", ids, "icons"] => list_route(ids, "summonerService", "getSummonerIcons"),
        ["list", ids, "names"] => list_route(ids, "summonerService", "getSummonerNames"),
        ["server", "status"] => Ok(Route::ServerStatus),
        ["server", "worker", idx, "test"] => admin_route(idx, AdminAction::Test),
        ["server", "worker", idx, "restart"] => admin_route(idx, AdminAction::Restart),
        ["server", "worker", idx, "kill"] => admin_route(idx, AdminAction::Kill),
        ["numeric", n, dest, op] => {
            let id = parse_u32(n)?;
            if dest.is_empty() || op.is_empty() {
                return Err(());
            }
            Ok(invoke(RequestKind::Numeric, dest, op, RequestPayload::Numeric(id)))
        }
        _ => Err(()),
    }
}

fn invoke(kind: RequestKind, dest: &str, op: &str, payload: RequestPayload) -> Route {
    Route::Invoke(PendingInvocation {
        kind,
        dest: dest.to_owned(),
        op: op.to_owned(),
        payload,
    })
}

fn numeric_route(n: &str, dest: &str, op: &str) -> Result<Route, ()> {
    let id = parse_u32(n)?;
    Ok(invoke(RequestKind::Numeric, dest, op, RequestPayload::Numeric(id)))
}

fn list_route(ids: &str, dest: &str, op: &str) -> Result<Route, ()> {
    if ids.is_empty() {
        return Err(());
    }
    let parsed: Vec<u32> = ids
        .split(';')
        .map(parse_u32)
        .collect::<Result<_, ()>>()?;
    if parsed.is_empty() || parsed.len() > MAX_LIST_IDS {
        return Err(());
    }
    Ok(invoke(RequestKind::List, dest, op, RequestPayload::List(parsed)))
}

fn admin_route(idx: &str, action: AdminAction) -> Result<Route, ()> {
    let index: usize = idx.parse().map_err(|_| ())?;
    Ok(Route::WorkerAdmin { index, action })
}

fn parse_u32(s: &str) -> Result<u32, ()> {
    s.parse::<u32>().map_err(|_| ())
}

/// `%20` → space: the only percent-escape the API handler decodes (§4.2).
fn decode_spaces(s: &str) -> String {
    s.replace("%20", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_route_decodes_percent20() {
        let route = parse_route("/player/Fizz%20Bang").unwrap();
        match route {
            Route::Invoke(inv) => {
                assert_eq!(inv.dest, "summonerService");
                assert_eq!(inv.op, "getSummonerByName");
                assert_eq!(inv.payload, RequestPayload::Str("Fizz Bang".to_owned()));
            }
            _ => panic!("expected Invoke route"),
        }
    }

    #[test]
    fn in_game_route_targets_game_service() {
        let route = parse_route("/player/Honux/inGame").unwrap();
        match route {
            Route::Invoke(inv) => {
                assert_eq!(inv.dest, "gameService");
                assert_eq!(inv.op, "retrieveInProgressSpectatorGameInfo");
            }
            _ => panic!("expected Invoke route"),
        }
    }

    #[test]
    fn list_route_caps_at_30() {
        let ids: Vec<String> = (0..31).map(|i| i.to_string()).collect();
        let path = format!("/list/{}/icons", ids.join(";"));
        assert!(parse_route(&path).is_err());
    }

    #[test]
    fn list_route_accepts_30() {
        let ids: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let path = format!("/list/{}/icons", ids.join(";"));
        assert!(parse_route(&path).is_ok());
    }

    #[test]
    fn ranked_stats_requires_single_digit_queue() {
        assert!(parse_route("/accountid/1/rankedStats/12").is_err());
        assert!(parse_route("/accountid/1/rankedStats/4").is_ok());
    }

    #[test]
    fn honor_route_builds_json_string_payload() {
        let route = parse_route("/summonerid/99/honor").unwrap();
        match route {
            Route::Invoke(inv) => {
                assert_eq!(
                    inv.payload,
                    RequestPayload::Str(r#"{"commandName":"TOTALS","summonerId":99}"#.to_owned())
                );
            }
            _ => panic!("expected Invoke route"),
        }
    }

    #[test]
    fn unknown_path_is_rejected() {
        assert!(parse_route("/unknown/thing").is_err());
    }

    #[test]
    fn numeric_passthrough_builds_generic_dest_op() {
        let route = parse_route("/numeric/5/someService/someOp").unwrap();
        match route {
            Route::Invoke(inv) => {
                assert_eq!(inv.kind, RequestKind::Numeric);
                assert_eq!(inv.dest, "someService");
                assert_eq!(inv.op, "someOp");
                assert_eq!(inv.payload, RequestPayload::Numeric(5));
            }
            _ => panic!("expected Invoke route"),
        }
    }

    #[test]
    fn admin_routes_parse_index() {
        assert_eq!(
            parse_route("/server/worker/2/kill").unwrap(),
            Route::WorkerAdmin {
                index: 2,
                action: AdminAction::Kill
            }
        );
    }

    #[test]
    fn server_status_is_recognised() {
        assert_eq!(parse_route("/server/status").unwrap(), Route::ServerStatus);
    }
}
